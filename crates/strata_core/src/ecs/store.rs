// store.rs - Archetype-based entity store
//
// Every live entity owns exactly one (archetype, row) location. Structural
// changes (adding/removing components) move the entity's row between
// archetypes: overlapping columns are copied bitwise, vacated slots are
// swap-filled by the source archetype's last row, and the displaced
// entity's record is fixed up.

use crate::ecs::bundle::{ClonedBundle, ComponentBundle, ComponentSet, ErasedComponent};
use crate::ecs::entity::{EntityLocation, EntityRecord};
use crate::ecs::query::{Query, QueryIter};
use crate::ecs::{ArchetypeKey, ArchetypeStorage, Component, ComponentId, ComponentRegistry, EntityId};
use crate::error::EcsError;
use std::collections::HashMap;

pub struct EntityStore {
    registry: ComponentRegistry,
    pub(crate) archetypes: Vec<ArchetypeStorage>,
    by_key: HashMap<ArchetypeKey, u32>,
    records: Vec<EntityRecord>,
    free: Vec<u32>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            archetypes: Vec::new(),
            by_key: HashMap::new(),
            records: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Register a component type, assigning its dense id at first use.
    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        self.registry.register::<T>()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Create an entity from a bundle of component values (possibly empty).
    pub fn add_entity<B: ComponentBundle>(&mut self, bundle: B) -> Result<EntityId, EcsError> {
        let comps = bundle.erase(&self.registry)?;
        Ok(self.spawn_erased(comps))
    }

    /// Create an entity cloning the referenced component values in.
    pub fn add_entity_cloned<B: ClonedBundle>(&mut self, bundle: &B) -> Result<EntityId, EcsError> {
        let comps = bundle.erase_cloned(&self.registry)?;
        Ok(self.spawn_erased(comps))
    }

    /// Add (or overwrite) components on an existing entity.
    pub fn add_components<B: ComponentBundle>(
        &mut self,
        id: EntityId,
        bundle: B,
    ) -> Result<(), EcsError> {
        let comps = bundle.erase(&self.registry)?;
        self.insert_erased(id, comps)
    }

    /// Add components cloned from references.
    pub fn add_components_cloned<B: ClonedBundle>(
        &mut self,
        id: EntityId,
        bundle: &B,
    ) -> Result<(), EcsError> {
        let comps = bundle.erase_cloned(&self.registry)?;
        self.insert_erased(id, comps)
    }

    /// Remove the named component types from an entity. Types the entity
    /// does not carry are ignored; unregistered types fail the call.
    pub fn remove_components<S: ComponentSet>(&mut self, id: EntityId) -> Result<(), EcsError> {
        let ids = S::ids(&self.registry)?;
        self.remove_ids(id, &ids)
    }

    /// Destroy an entity and free its record.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<(), EcsError> {
        let loc = self.location(id)?;
        let storage = &mut self.archetypes[loc.archetype as usize];
        let row = loc.row as usize;
        // Safety: the row holds live values; it is vacated before removal.
        let moved = unsafe {
            storage.drop_row(row);
            storage.swap_remove_vacated(row)
        };
        self.fix_moved_record(moved, loc.archetype, loc.row);
        let record = &mut self.records[id.index()];
        record.location = None;
        record.generation = record.generation.wrapping_add(1);
        self.free.push(id.index() as u32);
        Ok(())
    }

    /// The component ids in the entity's archetype key.
    pub fn get_all_components(&self, id: EntityId) -> Result<&[ComponentId], EcsError> {
        let loc = self.location(id)?;
        Ok(self.archetypes[loc.archetype as usize].key().ids())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.location(id).is_ok()
    }

    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        let cid = self.registry.lookup::<T>().ok()?;
        let loc = self.location(id).ok()?;
        let ptr = self.archetypes[loc.archetype as usize].component_ptr(cid, loc.row as usize)?;
        // Safety: columns are aligned; &self forbids concurrent mutation.
        Some(unsafe { &*(ptr as *const T) })
    }

    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        let cid = self.registry.lookup::<T>().ok()?;
        let loc = self.location(id).ok()?;
        let ptr = self.archetypes[loc.archetype as usize].component_ptr(cid, loc.row as usize)?;
        // Safety: columns are aligned; &mut self guarantees exclusivity.
        Some(unsafe { &mut *(ptr as *mut T) })
    }

    /// Iterate `(id, components...)` over every entity whose archetype
    /// contains all required parameters. The iterator exclusively borrows
    /// the store; archetype visit order is creation order.
    pub fn query<Q: Query>(&mut self) -> QueryIter<'_, Q> {
        QueryIter::new(self)
    }

    pub fn live_entities(&self) -> usize {
        self.archetypes.iter().map(|a| a.len()).sum()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Row count per archetype in creation order.
    pub fn archetype_row_counts(&self) -> Vec<usize> {
        self.archetypes.iter().map(|a| a.len()).collect()
    }

    // ---- internals ----------------------------------------------------

    pub(crate) fn location(&self, id: EntityId) -> Result<EntityLocation, EcsError> {
        if id.is_provisional() {
            return Err(EcsError::EntityNotFound(id));
        }
        let record = self
            .records
            .get(id.index())
            .ok_or(EcsError::EntityNotFound(id))?;
        if record.generation != id.generation() {
            return Err(EcsError::EntityNotFound(id));
        }
        record.location.ok_or(EcsError::EntityNotFound(id))
    }

    fn alloc_record(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let generation = self.records[index as usize].generation;
            EntityId::new(index, generation)
        } else {
            let index = self.records.len() as u32;
            self.records.push(EntityRecord {
                generation: 0,
                location: None,
            });
            EntityId::new(index, 0)
        }
    }

    fn get_or_create_archetype(&mut self, key: ArchetypeKey) -> u32 {
        if let Some(&index) = self.by_key.get(&key) {
            return index;
        }
        let index = self.archetypes.len() as u32;
        self.archetypes
            .push(ArchetypeStorage::new(key.clone(), &self.registry));
        self.by_key.insert(key, index);
        index
    }

    /// Keep the last value per component id, dropping earlier duplicates.
    fn dedup_components(comps: Vec<ErasedComponent>) -> Vec<ErasedComponent> {
        let mut out: Vec<ErasedComponent> = Vec::with_capacity(comps.len());
        for comp in comps {
            if let Some(slot) = out.iter_mut().find(|c| c.id() == comp.id()) {
                *slot = comp;
            } else {
                out.push(comp);
            }
        }
        out
    }

    pub(crate) fn spawn_erased(&mut self, comps: Vec<ErasedComponent>) -> EntityId {
        let comps = Self::dedup_components(comps);
        let key = ArchetypeKey::from_ids(comps.iter().map(|c| c.id()).collect());
        let arch = self.get_or_create_archetype(key);
        let id = self.alloc_record();
        let storage = &mut self.archetypes[arch as usize];
        let row = storage.push_row(id);
        for comp in comps {
            // Safety: the slot is vacant and ownership transfers to the column.
            unsafe { storage.write_component(row, comp.id(), comp.as_ptr()) };
            comp.forget_value();
        }
        self.records[id.index()].location = Some(EntityLocation {
            archetype: arch,
            row: row as u32,
        });
        id
    }

    pub(crate) fn insert_erased(
        &mut self,
        id: EntityId,
        comps: Vec<ErasedComponent>,
    ) -> Result<(), EcsError> {
        let comps = Self::dedup_components(comps);
        let loc = self.location(id)?;
        let src_arch = loc.archetype as usize;
        let src_row = loc.row as usize;
        let new_ids: Vec<ComponentId> = comps.iter().map(|c| c.id()).collect();
        let current_key = self.archetypes[src_arch].key().clone();
        let target_key = current_key.with(&new_ids);

        if target_key == current_key {
            // Same archetype: overwrite in place.
            let storage = &mut self.archetypes[src_arch];
            for comp in comps {
                // Safety: the slot holds a live value which is dropped
                // before the replacement moves in.
                unsafe {
                    storage.drop_component(src_row, comp.id());
                    storage.write_component(src_row, comp.id(), comp.as_ptr());
                }
                comp.forget_value();
            }
            return Ok(());
        }

        let dst_arch = self.get_or_create_archetype(target_key) as usize;
        let (src, dst) = self.two_storages(src_arch, dst_arch);
        let dst_row = dst.push_row(id);

        // Move every existing column over (the target is a superset).
        for &cid in src.key().ids() {
            let ptr = src
                .component_ptr(cid, src_row)
                .expect("source column missing during migration");
            // Safety: bitwise move; the source slot is treated as vacated below.
            unsafe { dst.write_component(dst_row, cid, ptr) };
        }
        for comp in comps {
            if current_key.contains(comp.id()) {
                // The old value just moved into the target row; replace it.
                // Safety: slot holds the moved-in live value.
                unsafe { dst.drop_component(dst_row, comp.id()) };
            }
            // Safety: slot is vacant (new column or just dropped).
            unsafe { dst.write_component(dst_row, comp.id(), comp.as_ptr()) };
            comp.forget_value();
        }

        // Safety: every slot in the source row was moved out above.
        let moved = unsafe { src.swap_remove_vacated(src_row) };
        self.fix_moved_record(moved, loc.archetype, loc.row);
        self.records[id.index()].location = Some(EntityLocation {
            archetype: dst_arch as u32,
            row: dst_row as u32,
        });
        Ok(())
    }

    pub(crate) fn remove_ids(&mut self, id: EntityId, ids: &[ComponentId]) -> Result<(), EcsError> {
        let loc = self.location(id)?;
        let src_arch = loc.archetype as usize;
        let src_row = loc.row as usize;
        let current_key = self.archetypes[src_arch].key().clone();
        let removed: Vec<ComponentId> = ids
            .iter()
            .copied()
            .filter(|&cid| current_key.contains(cid))
            .collect();
        if removed.is_empty() {
            return Ok(());
        }
        let target_key = current_key.without(&removed);
        let dst_arch = self.get_or_create_archetype(target_key.clone()) as usize;
        let (src, dst) = self.two_storages(src_arch, dst_arch);
        let dst_row = dst.push_row(id);

        let src_ids: Vec<ComponentId> = src.key().ids().to_vec();
        for cid in src_ids {
            if target_key.contains(cid) {
                let ptr = src
                    .component_ptr(cid, src_row)
                    .expect("source column missing during migration");
                // Safety: bitwise move into the vacant target slot.
                unsafe { dst.write_component(dst_row, cid, ptr) };
            } else {
                // Safety: the slot holds a live value being discarded.
                unsafe { src.drop_component(src_row, cid) };
            }
        }

        // Safety: every slot in the source row was moved out or dropped.
        let moved = unsafe { src.swap_remove_vacated(src_row) };
        self.fix_moved_record(moved, loc.archetype, loc.row);
        self.records[id.index()].location = Some(EntityLocation {
            archetype: dst_arch as u32,
            row: dst_row as u32,
        });
        Ok(())
    }

    pub(crate) fn despawn_erased(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.remove_entity(id)
    }

    fn fix_moved_record(&mut self, moved: Option<EntityId>, archetype: u32, row: u32) {
        if let Some(moved_id) = moved {
            let record = &mut self.records[moved_id.index()];
            match &mut record.location {
                Some(location) => {
                    assert_eq!(
                        location.archetype, archetype,
                        "swap-filled entity recorded in a different archetype"
                    );
                    location.row = row;
                }
                None => panic!("swap-filled entity {moved_id} has no live record"),
            }
        }
    }

    fn two_storages(
        &mut self,
        a: usize,
        b: usize,
    ) -> (&mut ArchetypeStorage, &mut ArchetypeStorage) {
        assert_ne!(a, b, "archetype migration within one archetype");
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Pos {
        x: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Vel {
        x: f32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Tag(String);

    fn store() -> EntityStore {
        let mut s = EntityStore::new();
        s.register_component::<Pos>();
        s.register_component::<Vel>();
        s.register_component::<Tag>();
        s
    }

    #[test]
    fn add_entity_requires_registration() {
        let mut s = EntityStore::new();
        let err = s.add_entity((Pos { x: 1.0 },)).unwrap_err();
        assert!(matches!(err, EcsError::InvalidComponent { .. }));
    }

    #[test]
    fn same_component_set_shares_archetype() {
        let mut s = store();
        let a = s.add_entity((Pos { x: 1.0 }, Vel { x: 2.0 })).unwrap();
        let b = s.add_entity((Vel { x: 4.0 }, Pos { x: 3.0 })).unwrap();
        assert_eq!(s.archetype_count(), 1);
        assert_eq!(s.get_all_components(a).unwrap(), s.get_all_components(b).unwrap());
    }

    #[test]
    fn add_components_migrates_and_preserves_values() {
        let mut s = store();
        let e = s.add_entity((Pos { x: 1.0 },)).unwrap();
        s.add_components(e, (Vel { x: 2.0 },)).unwrap();
        assert_eq!(s.get_component::<Pos>(e), Some(&Pos { x: 1.0 }));
        assert_eq!(s.get_component::<Vel>(e), Some(&Vel { x: 2.0 }));
    }

    #[test]
    fn add_existing_component_overwrites_in_place() {
        let mut s = store();
        let e = s.add_entity((Pos { x: 1.0 },)).unwrap();
        let archetypes_before = s.archetype_count();
        s.add_components(e, (Pos { x: 9.0 },)).unwrap();
        assert_eq!(s.archetype_count(), archetypes_before);
        assert_eq!(s.get_component::<Pos>(e), Some(&Pos { x: 9.0 }));
    }

    #[test]
    fn add_then_remove_is_identity() {
        let mut s = store();
        let e = s.add_entity((Pos { x: 1.0 },)).unwrap();
        s.add_components(e, (Vel { x: 2.0 },)).unwrap();
        s.remove_components::<(Vel,)>(e).unwrap();
        assert_eq!(s.get_all_components(e).unwrap().len(), 1);
        assert_eq!(s.get_component::<Pos>(e), Some(&Pos { x: 1.0 }));
        assert_eq!(s.get_component::<Vel>(e), None);
    }

    #[test]
    fn swap_remove_fixes_up_displaced_entity() {
        let mut s = store();
        let a = s.add_entity((Pos { x: 1.0 },)).unwrap();
        let b = s.add_entity((Pos { x: 2.0 },)).unwrap();
        let c = s.add_entity((Pos { x: 3.0 },)).unwrap();
        // Removing the first row swaps the last row into its place.
        s.remove_entity(a).unwrap();
        assert_eq!(s.get_component::<Pos>(b), Some(&Pos { x: 2.0 }));
        assert_eq!(s.get_component::<Pos>(c), Some(&Pos { x: 3.0 }));
    }

    #[test]
    fn removed_entity_is_gone_and_handle_is_stale() {
        let mut s = store();
        let e = s.add_entity((Pos { x: 1.0 },)).unwrap();
        s.remove_entity(e).unwrap();
        assert!(!s.contains(e));
        assert!(matches!(
            s.remove_entity(e),
            Err(EcsError::EntityNotFound(_))
        ));
        // The slot is reused with a bumped generation; the old handle stays dead.
        let e2 = s.add_entity((Pos { x: 5.0 },)).unwrap();
        assert!(s.contains(e2));
        assert!(!s.contains(e));
    }

    #[test]
    fn spawn_then_despawn_leaves_counts_unchanged() {
        let mut s = store();
        let _stable = s.add_entity((Pos { x: 0.0 },)).unwrap();
        let counts_before = s.archetype_row_counts();
        let e = s.add_entity((Pos { x: 1.0 }, Vel { x: 1.0 })).unwrap();
        s.remove_entity(e).unwrap();
        // The pair archetype now exists but holds zero rows.
        let counts_after = s.archetype_row_counts();
        assert_eq!(counts_before[0], counts_after[0]);
        assert!(counts_after[1..].iter().all(|&n| n == 0));
    }

    #[test]
    fn non_copy_components_survive_migration() {
        let mut s = store();
        let e = s.add_entity((Tag("hello".to_string()),)).unwrap();
        s.add_components(e, (Pos { x: 1.0 },)).unwrap();
        assert_eq!(s.get_component::<Tag>(e), Some(&Tag("hello".to_string())));
        s.remove_components::<(Pos,)>(e).unwrap();
        assert_eq!(s.get_component::<Tag>(e), Some(&Tag("hello".to_string())));
        s.remove_entity(e).unwrap();
    }

    #[test]
    fn zero_component_entity_gains_component() {
        let mut s = store();
        let e = s.add_entity(()).unwrap();
        assert!(s.get_all_components(e).unwrap().is_empty());
        s.add_components(e, (Pos { x: 7.0 },)).unwrap();
        assert_eq!(s.get_component::<Pos>(e), Some(&Pos { x: 7.0 }));
    }

    #[test]
    fn cloned_bundle_copies_references_in() {
        let mut s = store();
        let tag = Tag("shared".to_string());
        let e = s.add_entity_cloned(&(&tag,)).unwrap();
        assert_eq!(s.get_component::<Tag>(e), Some(&tag));
        // The original is still usable.
        assert_eq!(tag.0, "shared");
    }
}
