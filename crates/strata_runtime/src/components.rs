// components.rs - Runtime components shared across systems

use glam::{Quat, Vec3};

/// World placement of an entity. Hierarchy propagation is a collaborator's
/// concern; physics and streaming only read and write the flat fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Marks the entity the streaming controller follows (typically the
/// camera). Without one, no streaming work happens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingFocus;
