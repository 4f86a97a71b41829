// archetype_storage.rs - SoA storage for one archetype
//
// Parallel columns, one per component type in the canonical key, all sharing
// the same row count. Rows are removed by swapping the last row in; the
// store fixes up the moved entity's record with the returned id.

use crate::ecs::{ArchetypeKey, ComponentId, ComponentRegistry, EntityId};

use super::Column;

pub struct ArchetypeStorage {
    key: ArchetypeKey,
    columns: Vec<Column>, // parallel to key.ids()
    entities: Vec<EntityId>,
    cap: usize,
}

impl ArchetypeStorage {
    const INITIAL_CAPACITY: usize = 8;

    pub fn new(key: ArchetypeKey, registry: &ComponentRegistry) -> Self {
        let columns = key
            .ids()
            .iter()
            .map(|&id| Column::new(*registry.info(id)))
            .collect();
        Self {
            key,
            columns,
            entities: Vec::new(),
            cap: 0,
        }
    }

    pub fn key(&self) -> &ArchetypeKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn entity_at(&self, row: usize) -> EntityId {
        self.entities[row]
    }

    fn column_index(&self, id: ComponentId) -> Option<usize> {
        self.key.position(id)
    }

    /// Append a vacant row for `entity`; component slots must be written
    /// before the row is observed.
    pub fn push_row(&mut self, entity: EntityId) -> usize {
        let row = self.entities.len();
        if row == self.cap {
            let new_cap = (self.cap * 2).max(Self::INITIAL_CAPACITY);
            for col in &mut self.columns {
                col.grow_to(new_cap, row);
            }
            self.cap = new_cap;
        }
        self.entities.push(entity);
        row
    }

    /// Raw pointer to one component slot. The caller upholds the aliasing
    /// rules for whatever references it derives.
    pub(crate) fn component_ptr(&self, id: ComponentId, row: usize) -> Option<*mut u8> {
        debug_assert!(row < self.entities.len(), "row out of bounds");
        let col = self.column_index(id)?;
        // Safety: row is within bounds per the assert above.
        Some(unsafe { self.columns[col].ptr_at(row) })
    }

    /// Move a component value's bytes from `src` into `(row, id)`.
    ///
    /// # Safety
    /// See `Column::write_from`; additionally `id` must be part of this
    /// archetype's key, which is a store invariant.
    pub(crate) unsafe fn write_component(&mut self, row: usize, id: ComponentId, src: *const u8) {
        let col = self
            .column_index(id)
            .unwrap_or_else(|| panic!("component {id} missing from archetype key"));
        self.columns[col].write_from(row, src);
    }

    /// Drop one component value in place, leaving its slot vacant.
    ///
    /// # Safety
    /// The slot must hold a live value.
    pub(crate) unsafe fn drop_component(&mut self, row: usize, id: ComponentId) {
        if let Some(col) = self.column_index(id) {
            self.columns[col].drop_at(row);
        }
    }

    /// Drop every component value in `row`, leaving the row vacant.
    ///
    /// # Safety
    /// The row must hold live values in every column.
    pub(crate) unsafe fn drop_row(&mut self, row: usize) {
        for col in &mut self.columns {
            col.drop_at(row);
        }
    }

    /// Swap-remove a vacated row (all slots moved out or dropped).
    /// Returns the entity whose row index changed, if any.
    ///
    /// # Safety
    /// Every component slot in `row` must already be vacant.
    pub(crate) unsafe fn swap_remove_vacated(&mut self, row: usize) -> Option<EntityId> {
        let last = self.entities.len() - 1;
        if row != last {
            for col in &mut self.columns {
                col.move_row(last, row);
            }
            self.entities[row] = self.entities[last];
            self.entities.pop();
            Some(self.entities[row])
        } else {
            self.entities.pop();
            None
        }
    }
}

impl Drop for ArchetypeStorage {
    fn drop(&mut self) {
        for col in &mut self.columns {
            if col.info().drop_fn.is_some() {
                for row in 0..self.entities.len() {
                    // Safety: rows 0..len hold live values.
                    unsafe { col.drop_at(row) };
                }
            }
        }
    }
}
