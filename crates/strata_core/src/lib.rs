//! Strata Engine Core
//!
//! Contains the fundamental simulation systems:
//! - Archetype-based entity store with typed queries
//! - Staged scheduler with deferred commands
//! - Type-keyed resources
//! - Deterministic time and math

pub mod ecs;
pub mod error;
pub mod math;
pub mod schedule;
pub mod time;

pub use ecs::{
    Component, ComponentBundle, ComponentId, ComponentRegistry, ComponentSet, EntityId,
    EntityStore, With,
};
pub use error::EcsError;
pub use schedule::{App, Commands, Module, Resources, Stage, SystemCtx};

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
