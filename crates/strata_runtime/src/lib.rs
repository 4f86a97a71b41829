//! Strata Engine Runtime
//!
//! Wires the core crates into a running app: the streaming system feeding
//! the voxel world from the focus entity, and the sync system exchanging
//! snapshots and results with the physics thread.

pub mod assets;
pub mod brick_updates;
pub mod components;
pub mod modules;
pub mod physics_sync;
pub mod settings;
pub mod world_stream;

pub use assets::{AssetError, AssetId, ModelAssets};
pub use brick_updates::BrickUpdates;
pub use components::{StreamingFocus, Transform};
pub use modules::{shutdown_physics, PhysicsLink, PhysicsModule, WorldModule};
pub use settings::Settings;
