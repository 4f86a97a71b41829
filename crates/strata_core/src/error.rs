// error.rs - Recoverable data-plane errors for the entity store and scheduler
//
// Internal consistency violations (column length mismatch, missing archetype)
// are not represented here: they panic with context, since any behaviour past
// that point is undefined.

use crate::ecs::EntityId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcsError {
    /// The operand type was never registered with the store.
    #[error("`{name}` is not a registered component type")]
    InvalidComponent { name: &'static str },

    /// The entity id refers to a removed or never-created entity.
    #[error("entity {0} does not exist")]
    EntityNotFound(EntityId),

    /// A system declared a resource that is absent at binding time.
    /// Fatal to that system's installation.
    #[error("system `{system}` requires resource `{resource}` which is not present")]
    UnresolvedResource {
        system: String,
        resource: &'static str,
    },

    /// Two systems registered under the same name.
    #[error("duplicate system name `{0}`")]
    DuplicateSystem(String),

    /// A state predicate refers to a state outside the configured range,
    /// or states were never enabled on the app.
    #[error("state {state} outside configured range {min}..={max}")]
    StateOutOfRange { state: i32, min: i32, max: i32 },
}
