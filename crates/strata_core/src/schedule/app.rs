// app.rs - Staged scheduler
//
// Systems register against a named stage; within a stage, registration
// order is the observed order, across stages the ordinal order is strict.
// The command buffer is drained into the store after every system run, so
// each system sees a consistent snapshot of the store for its whole run.

use crate::ecs::{Component, ComponentId, EntityStore};
use crate::error::EcsError;
use crate::schedule::system::{SystemCtx, SystemEntry, TransitionEntry};
use crate::schedule::{Commands, Resources};
use std::any::TypeId;
use std::collections::HashSet;

/// Fixed stage ordinals for the main-thread frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    PreUpdate,
    Update,
    PreRender,
    Render,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::PreUpdate, Stage::Update, Stage::PreRender, Stage::Render];
}

/// A reusable bundle of registrations. `install` runs once and receives the
/// app, which hands out both the system-registration surface and a
/// `Commands` handle for initial entities.
pub trait Module {
    fn install(&self, app: &mut App);
}

pub struct App {
    store: EntityStore,
    resources: Resources,
    commands: Commands,
    systems: Vec<SystemEntry>,
    enter_systems: Vec<TransitionEntry>,
    exit_systems: Vec<TransitionEntry>,
    state_range: Option<(i32, i32)>,
    current_state: i32,
    pending_state: Option<i32>,
    bound: bool,
    tick_index: u64,
}

impl App {
    pub fn new() -> Self {
        Self {
            store: EntityStore::new(),
            resources: Resources::new(),
            commands: Commands::new(),
            systems: Vec::new(),
            enter_systems: Vec::new(),
            exit_systems: Vec::new(),
            state_range: None,
            current_state: 0,
            pending_state: None,
            bound: false,
            tick_index: 0,
        }
    }

    pub fn use_module<M: Module>(&mut self, module: M) -> &mut Self {
        module.install(self);
        self
    }

    /// Enable stateful scheduling over the inclusive state range.
    /// The initial state is `min`.
    pub fn use_states(&mut self, min: i32, max: i32) -> &mut Self {
        self.state_range = Some((min, max));
        self.current_state = min;
        self
    }

    /// Register a system; defaults to `Update` and running always.
    pub fn use_system<F>(&mut self, name: &str, run: F) -> SystemConfig<'_>
    where
        F: FnMut(&mut SystemCtx) + Send + 'static,
    {
        self.bound = false;
        self.systems.push(SystemEntry {
            name: name.to_string(),
            stage: Stage::Update,
            state: None,
            declared_resources: Vec::new(),
            run: Box::new(run),
        });
        let index = self.systems.len() - 1;
        SystemConfig { app: self, index }
    }

    /// Register a transition system run exactly once when `state` is entered.
    pub fn on_enter<F>(&mut self, state: i32, name: &str, run: F) -> &mut Self
    where
        F: FnMut(&mut SystemCtx) + Send + 'static,
    {
        self.bound = false;
        self.enter_systems.push(TransitionEntry {
            name: name.to_string(),
            state,
            run: Box::new(run),
        });
        self
    }

    /// Register a transition system run exactly once when `state` is exited.
    pub fn on_exit<F>(&mut self, state: i32, name: &str, run: F) -> &mut Self
    where
        F: FnMut(&mut SystemCtx) + Send + 'static,
    {
        self.bound = false;
        self.exit_systems.push(TransitionEntry {
            name: name.to_string(),
            state,
            run: Box::new(run),
        });
        self
    }

    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        self.store.register_component::<T>()
    }

    pub fn insert_resource<R: Send + Sync + 'static>(&mut self, value: R) -> &mut Self {
        self.resources.insert(value);
        self
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    pub fn commands_mut(&mut self) -> &mut Commands {
        &mut self.commands
    }

    pub fn state(&self) -> Option<i32> {
        self.state_range.map(|_| self.current_state)
    }

    /// Request a state transition before or between ticks.
    pub fn set_state(&mut self, state: i32) {
        self.pending_state = Some(state);
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Validate registrations: duplicate names, state predicates against the
    /// configured range, and every declared resource being present.
    pub fn bind(&mut self) -> Result<(), EcsError> {
        let mut names: HashSet<&str> = HashSet::new();
        for system in &self.systems {
            if !names.insert(system.name.as_str()) {
                return Err(EcsError::DuplicateSystem(system.name.clone()));
            }
        }
        for system in &self.systems {
            if let Some(state) = system.state {
                let (min, max) = self.state_range.unwrap_or((0, -1));
                if state < min || state > max {
                    return Err(EcsError::StateOutOfRange { state, min, max });
                }
            }
            for &(type_id, resource) in &system.declared_resources {
                if !self.resources.contains_type_id(type_id) {
                    return Err(EcsError::UnresolvedResource {
                        system: system.name.clone(),
                        resource,
                    });
                }
            }
        }
        self.bound = true;
        Ok(())
    }

    /// Advance one frame: apply a pending state transition, then run every
    /// stage's systems in registration order, draining commands after each.
    pub fn tick(&mut self) -> Result<(), EcsError> {
        if !self.bound {
            // Module installs may have queued initial entities/resources.
            self.commands.flush(&mut self.store, &mut self.resources);
            self.bind()?;
        }

        if let Some(next) = self.pending_state.take() {
            if self.state_range.is_some() && next != self.current_state {
                let (min, max) = self.state_range.unwrap_or((0, -1));
                if next < min || next > max {
                    return Err(EcsError::StateOutOfRange { state: next, min, max });
                }
                self.run_transitions(false, self.current_state);
                self.run_transitions(true, next);
                self.current_state = next;
            }
        }

        for stage in Stage::ALL {
            for index in 0..self.systems.len() {
                if self.systems[index].stage != stage {
                    continue;
                }
                if let Some(state) = self.systems[index].state {
                    if self.state_range.is_none() || state != self.current_state {
                        continue;
                    }
                }
                self.run_system_at(index);
                self.commands.flush(&mut self.store, &mut self.resources);
            }
        }
        self.tick_index += 1;
        Ok(())
    }

    fn run_system_at(&mut self, index: usize) {
        let current_state = self.state_range.map(|_| self.current_state);
        let system = &mut self.systems[index];
        let mut ctx = SystemCtx {
            store: &mut self.store,
            resources: &mut self.resources,
            commands: &mut self.commands,
            next_state: &mut self.pending_state,
            current_state,
        };
        (system.run)(&mut ctx);
    }

    fn run_transitions(&mut self, entering: bool, state: i32) {
        let current_state = self.state_range.map(|_| self.current_state);
        let list = if entering {
            &mut self.enter_systems
        } else {
            &mut self.exit_systems
        };
        for transition in list.iter_mut().filter(|t| t.state == state) {
            tracing::debug!(name = %transition.name, state, entering, "state transition system");
            let mut ctx = SystemCtx {
                store: &mut self.store,
                resources: &mut self.resources,
                commands: &mut self.commands,
                next_state: &mut self.pending_state,
                current_state,
            };
            (transition.run)(&mut ctx);
        }
        self.commands.flush(&mut self.store, &mut self.resources);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder handle for the most recently registered system.
pub struct SystemConfig<'app> {
    app: &'app mut App,
    index: usize,
}

impl<'app> SystemConfig<'app> {
    pub fn in_stage(self, stage: Stage) -> Self {
        self.app.systems[self.index].stage = stage;
        self
    }

    /// Run regardless of the scheduler state (the default).
    pub fn run_always(self) -> Self {
        self.app.systems[self.index].state = None;
        self
    }

    /// Run only while the app is in `state`.
    pub fn run_in_state(self, state: i32) -> Self {
        self.app.systems[self.index].state = Some(state);
        self
    }

    /// Declare a resource dependency, validated at bind time.
    pub fn reads_resource<R: Send + Sync + 'static>(self) -> Self {
        self.app.systems[self.index]
            .declared_resources
            .push((TypeId::of::<R>(), std::any::type_name::<R>()));
        self
    }
}
