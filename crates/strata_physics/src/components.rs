// components.rs - Physics components stored in the entity store

use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub gravity_scale: f32,
    pub is_static: bool,
    pub sleeping: bool,
    pub idle_time: f32,
}

impl RigidBody {
    pub fn dynamic(mass: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            gravity_scale: 1.0,
            is_static: false,
            sleeping: false,
            idle_time: 0.0,
        }
    }

    /// A body that never moves; terminal state per body.
    pub fn fixed() -> Self {
        Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 0.0,
            gravity_scale: 0.0,
            is_static: true,
            sleeping: false,
            idle_time: 0.0,
        }
    }

    /// Clear sleep state; a no-op on static bodies.
    pub fn wake(&mut self) {
        if self.is_static {
            return;
        }
        self.sleeping = false;
        self.idle_time = 0.0;
    }

    /// External impulse from gameplay code; wakes the body.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_static || self.mass <= 0.0 {
            return;
        }
        self.velocity += impulse / self.mass;
        self.wake();
    }
}

/// Shape selector carried for compatibility with older scene data; the
/// collider mode is picked from the model's voxel occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColliderShape {
    Model,
    Box,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    pub friction: f32,
    pub restitution: f32,
    pub shape: ColliderShape,
}

impl Collider {
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
            shape: ColliderShape::Model,
        }
    }
}
