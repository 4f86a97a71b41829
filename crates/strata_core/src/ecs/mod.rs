// mod.rs - Entity store module exports

mod archetype;
mod bundle;
mod component;
mod entity;
mod query;
mod storage;
mod store;

pub use archetype::ArchetypeKey;
pub use bundle::{ClonedBundle, ComponentBundle, ComponentSet, ErasedComponent};
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry};
pub use entity::EntityId;
pub use query::{Query, QueryAccess, QueryIter, QueryParam, With};
pub use storage::ArchetypeStorage;
pub use store::EntityStore;

/// Convenience macro for spawning entities.
///
/// # Example
/// ```ignore
/// let entity = spawn!(store,
///     Position { x: 1.0, y: 2.0 },
///     Velocity { x: 0.5, y: 0.0 },
/// )?;
/// ```
#[macro_export]
macro_rules! spawn {
    ($store:expr, $($comp:expr),+ $(,)?) => {
        $store.add_entity(($($comp,)+))
    };
}
