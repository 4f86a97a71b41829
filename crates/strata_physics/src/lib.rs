//! Strata Engine Async Physics Core
//!
//! A fixed-rate rigid-body simulator running on its own thread. The main
//! loop publishes immutable snapshots into a single-slot mailbox and applies
//! the latest results from the mirror slot; each side only ever wants the
//! other's latest payload, so intermediates are skipped. Collisions run in
//! two narrow-phase modes: 15-axis SAT over oriented boxes, and
//! voxel-precise grid probing when both bodies carry occupancy data.

mod collide;
mod components;
mod mailbox;
mod model;
mod runner;
mod sat;
mod sim;
mod snapshot;

pub use components::{Collider, ColliderShape, RigidBody};
pub use mailbox::Mailbox;
pub use model::{ModelBox, ModelVoxel, PhysicsModel, VoxelCategory};
pub use runner::{spawn_physics_thread, PhysicsHandle, PhysicsProxy};
pub use sat::{obb_contact, ray_obb, Contact, Obb};
pub use sim::{BodyState, SimConfig, Simulation};
pub use snapshot::{BodyResult, BodySnapshot, PhysicsResults, PhysicsSnapshot, WorldSlice};
