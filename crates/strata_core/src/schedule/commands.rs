// commands.rs - Deferred entity-structure mutations
//
// Systems never mutate the store's structure directly; they append tagged
// operations here. The scheduler drains the queue into the store between
// systems, so no system observes a partially applied batch. Entities
// created in a batch get provisional ids, valid for further operations
// within the same batch; the flush binds them to real entities.

use crate::ecs::{ComponentBundle, ComponentId, ComponentRegistry, ComponentSet, EntityId, EntityStore, ErasedComponent};
use crate::error::EcsError;
use crate::schedule::Resources;
use std::collections::HashMap;

type BundleEraser =
    Box<dyn FnOnce(&ComponentRegistry) -> Result<Vec<ErasedComponent>, EcsError> + Send>;
type SetResolver = Box<dyn FnOnce(&ComponentRegistry) -> Result<Vec<ComponentId>, EcsError> + Send>;
type ResourceInserter = Box<dyn FnOnce(&mut Resources) + Send>;

enum Command {
    Spawn {
        provisional: EntityId,
        bundle: BundleEraser,
    },
    Insert {
        target: EntityId,
        bundle: BundleEraser,
    },
    Remove {
        target: EntityId,
        set: SetResolver,
    },
    Despawn {
        target: EntityId,
    },
    InsertResource {
        insert: ResourceInserter,
    },
}

/// Per-frame, single-writer buffer of deferred operations.
pub struct Commands {
    queue: Vec<Command>,
    next_provisional: u32,
}

impl Commands {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            next_provisional: 0,
        }
    }

    /// Queue an entity spawn; the returned provisional id may be used by
    /// further operations in this batch and is dead after the flush.
    pub fn add_entity<B>(&mut self, bundle: B) -> EntityId
    where
        B: ComponentBundle + Send + 'static,
    {
        let provisional = EntityId::provisional(self.next_provisional);
        self.next_provisional += 1;
        self.queue.push(Command::Spawn {
            provisional,
            bundle: Box::new(move |registry| bundle.erase(registry)),
        });
        provisional
    }

    pub fn add_components<B>(&mut self, target: EntityId, bundle: B)
    where
        B: ComponentBundle + Send + 'static,
    {
        self.queue.push(Command::Insert {
            target,
            bundle: Box::new(move |registry| bundle.erase(registry)),
        });
    }

    pub fn remove_components<S>(&mut self, target: EntityId)
    where
        S: ComponentSet + 'static,
    {
        self.queue.push(Command::Remove {
            target,
            set: Box::new(|registry| S::ids(registry)),
        });
    }

    pub fn remove_entity(&mut self, target: EntityId) {
        self.queue.push(Command::Despawn { target });
    }

    /// Queue a resource insertion (replaces any existing value of the type).
    pub fn add_resource<R: Send + Sync + 'static>(&mut self, value: R) {
        self.queue.push(Command::InsertResource {
            insert: Box::new(move |resources| resources.insert(value)),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Apply queued operations in submission order. Failed operations are
    /// logged and skipped; the submitting system already returned, so there
    /// is no caller left to hand the error to.
    pub(crate) fn flush(&mut self, store: &mut EntityStore, resources: &mut Resources) {
        let mut bound: HashMap<usize, EntityId> = HashMap::new();
        for command in self.queue.drain(..) {
            match command {
                Command::Spawn {
                    provisional,
                    bundle,
                } => match bundle(store.registry()) {
                    Ok(comps) => {
                        let real = store.spawn_erased(comps);
                        bound.insert(provisional.index(), real);
                    }
                    Err(err) => tracing::warn!(%err, "deferred spawn dropped"),
                },
                Command::Insert { target, bundle } => {
                    let Some(target) = resolve(&bound, target) else {
                        tracing::warn!("deferred insert targets unbound provisional id");
                        continue;
                    };
                    let result = bundle(store.registry())
                        .and_then(|comps| store.insert_erased(target, comps));
                    if let Err(err) = result {
                        tracing::warn!(%err, %target, "deferred insert dropped");
                    }
                }
                Command::Remove { target, set } => {
                    let Some(target) = resolve(&bound, target) else {
                        tracing::warn!("deferred remove targets unbound provisional id");
                        continue;
                    };
                    let result =
                        set(store.registry()).and_then(|ids| store.remove_ids(target, &ids));
                    if let Err(err) = result {
                        tracing::warn!(%err, %target, "deferred remove dropped");
                    }
                }
                Command::Despawn { target } => {
                    let Some(target) = resolve(&bound, target) else {
                        tracing::warn!("deferred despawn targets unbound provisional id");
                        continue;
                    };
                    if let Err(err) = store.despawn_erased(target) {
                        tracing::warn!(%err, %target, "deferred despawn dropped");
                    }
                }
                Command::InsertResource { insert } => insert(resources),
            }
        }
        self.next_provisional = 0;
    }
}

fn resolve(bound: &HashMap<usize, EntityId>, id: EntityId) -> Option<EntityId> {
    if id.is_provisional() {
        bound.get(&id.index()).copied()
    } else {
        Some(id)
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}
