// snapshot.rs - Immutable payloads exchanged between the main and physics
// threads. Each round-trip hands the whole value over; the simulator is
// authoritative on its own cadence, the main thread on world state.

use crate::model::PhysicsModel;
use glam::{IVec3, Quat, Vec3};
use std::collections::HashSet;
use strata_core::EntityId;

/// One body as published by the main thread.
#[derive(Clone, Debug)]
pub struct BodySnapshot {
    pub entity: EntityId,
    /// Physics origin in world space (transform position plus rotated
    /// centre offset).
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub is_static: bool,
    pub sleeping: bool,
    pub idle_time: f32,
    pub mass: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub model: PhysicsModel,
}

/// Solid world voxels sampled around the dynamic bodies, so the simulator
/// can collide against the streamed world without touching the world lock.
#[derive(Clone, Debug)]
pub struct WorldSlice {
    pub voxel_size: f32,
    pub solids: HashSet<IVec3>,
    pub friction: f32,
    pub restitution: f32,
}

impl WorldSlice {
    pub fn new(voxel_size: f32) -> Self {
        Self {
            voxel_size,
            solids: HashSet::new(),
            friction: 0.6,
            restitution: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PhysicsSnapshot {
    pub bodies: Vec<BodySnapshot>,
    pub world: Option<WorldSlice>,
}

/// One body as published back by the simulator.
#[derive(Clone, Copy, Debug)]
pub struct BodyResult {
    pub entity: EntityId,
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub sleeping: bool,
    pub idle_time: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PhysicsResults {
    pub bodies: Vec<BodyResult>,
    /// Simulator tick the results were produced on.
    pub tick: u64,
}
