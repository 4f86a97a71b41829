// system.rs - System registration entries and the per-run context

use crate::ecs::{EntityStore, Query, QueryIter};
use crate::schedule::{Commands, Resources, Stage};
use std::any::TypeId;

/// Everything a system may touch while it runs: the exclusive store borrow,
/// the resources, the frame's command buffer, and state transitions.
pub struct SystemCtx<'a> {
    pub(crate) store: &'a mut EntityStore,
    pub(crate) resources: &'a mut Resources,
    pub(crate) commands: &'a mut Commands,
    pub(crate) next_state: &'a mut Option<i32>,
    pub(crate) current_state: Option<i32>,
}

impl<'a> SystemCtx<'a> {
    pub fn store(&mut self) -> &mut EntityStore {
        self.store
    }

    /// Convenience for `self.store().query::<Q>()`.
    pub fn query<Q: Query>(&mut self) -> QueryIter<'_, Q> {
        self.store.query::<Q>()
    }

    pub fn resource<R: Send + Sync + 'static>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    pub fn resource_mut<R: Send + Sync + 'static>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }

    pub fn commands(&mut self) -> &mut Commands {
        self.commands
    }

    /// Request a state transition; applied at the start of the next tick.
    pub fn set_state(&mut self, state: i32) {
        *self.next_state = Some(state);
    }

    /// The current scheduler state, None when states are disabled.
    pub fn state(&self) -> Option<i32> {
        self.current_state
    }
}

pub(crate) type SystemFn = Box<dyn FnMut(&mut SystemCtx) + Send>;

pub(crate) struct SystemEntry {
    pub name: String,
    pub stage: Stage,
    pub state: Option<i32>,
    pub declared_resources: Vec<(TypeId, &'static str)>,
    pub run: SystemFn,
}

/// One-shot system run at a state boundary.
pub(crate) struct TransitionEntry {
    pub name: String,
    pub state: i32,
    pub run: SystemFn,
}
