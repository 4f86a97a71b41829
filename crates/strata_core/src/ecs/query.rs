// query.rs - Typed archetype queries
//
// A query names component parameters as `&mut T` (required) or
// `Option<&mut T>` (optional). Matching archetypes are those whose key
// contains every required id; optional parameters yield None when the
// archetype lacks the column. The iterator holds the store's exclusive
// borrow for its whole lifetime, so handing out `&mut` rows is sound: each
// row is visited once.

use crate::ecs::component::{Component, ComponentId, ComponentRegistry, INVALID_COMPONENT};
use crate::ecs::{ArchetypeStorage, EntityId, EntityStore};
use std::marker::PhantomData;

/// Resolved access of one query parameter.
pub struct QueryAccess {
    pub id: ComponentId,
    pub required: bool,
}

/// One parameter of a query tuple.
pub trait QueryParam {
    type Item<'w>;

    fn access(registry: &ComponentRegistry) -> QueryAccess;

    /// # Safety
    /// `storage` must be valid, `row < len`, required columns must exist in
    /// the archetype, and the caller must guarantee each row is fetched at
    /// most once per iteration (no aliasing of the returned references).
    unsafe fn fetch<'w>(storage: *mut ArchetypeStorage, row: usize, id: ComponentId)
        -> Self::Item<'w>;
}

impl<'q, T: Component> QueryParam for &'q mut T {
    type Item<'w> = &'w mut T;

    fn access(registry: &ComponentRegistry) -> QueryAccess {
        QueryAccess {
            id: registry.lookup_or_invalid::<T>(),
            required: true,
        }
    }

    unsafe fn fetch<'w>(
        storage: *mut ArchetypeStorage,
        row: usize,
        id: ComponentId,
    ) -> Self::Item<'w> {
        let ptr = (*storage)
            .component_ptr(id, row)
            .expect("required query column missing from matched archetype");
        &mut *(ptr as *mut T)
    }
}

impl<'q, T: Component> QueryParam for Option<&'q mut T> {
    type Item<'w> = Option<&'w mut T>;

    fn access(registry: &ComponentRegistry) -> QueryAccess {
        QueryAccess {
            id: registry.lookup_or_invalid::<T>(),
            required: false,
        }
    }

    unsafe fn fetch<'w>(
        storage: *mut ArchetypeStorage,
        row: usize,
        id: ComponentId,
    ) -> Self::Item<'w> {
        if id == INVALID_COMPONENT {
            return None;
        }
        (*storage)
            .component_ptr(id, row)
            .map(|ptr| &mut *(ptr as *mut T))
    }
}

/// Presence filter: matches archetypes carrying `T` without borrowing the
/// column. Yields `()`.
pub struct With<T: Component>(PhantomData<T>);

impl<T: Component> QueryParam for With<T> {
    type Item<'w> = ();

    fn access(registry: &ComponentRegistry) -> QueryAccess {
        QueryAccess {
            id: registry.lookup_or_invalid::<T>(),
            required: true,
        }
    }

    unsafe fn fetch<'w>(
        _storage: *mut ArchetypeStorage,
        _row: usize,
        _id: ComponentId,
    ) -> Self::Item<'w> {
    }
}

/// A tuple of query parameters.
pub trait Query {
    type Item<'w>;

    fn accesses(registry: &ComponentRegistry) -> Vec<QueryAccess>;

    /// # Safety
    /// See [`QueryParam::fetch`]; `ids` must be the resolved access ids in
    /// parameter order.
    unsafe fn fetch<'w>(
        storage: *mut ArchetypeStorage,
        row: usize,
        ids: &[ComponentId],
    ) -> Self::Item<'w>;
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: QueryParam),+> Query for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);

            fn accesses(registry: &ComponentRegistry) -> Vec<QueryAccess> {
                vec![$($name::access(registry)),+]
            }

            unsafe fn fetch<'w>(
                storage: *mut ArchetypeStorage,
                row: usize,
                ids: &[ComponentId],
            ) -> Self::Item<'w> {
                let mut slot = ids.iter();
                ($({
                    let id = *slot.next().expect("query arity mismatch");
                    $name::fetch(storage, row, id)
                },)+)
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);

pub struct QueryIter<'w, Q: Query> {
    store: *mut EntityStore,
    ids: Vec<ComponentId>,
    matched: Vec<u32>,
    cursor: usize,
    row: usize,
    _marker: PhantomData<(&'w mut EntityStore, Q)>,
}

impl<'w, Q: Query> QueryIter<'w, Q> {
    pub(crate) fn new(store: &'w mut EntityStore) -> Self {
        let accesses = Q::accesses(store.registry());
        // Two required parameters naming the same component would alias.
        for (i, a) in accesses.iter().enumerate() {
            if a.id == INVALID_COMPONENT {
                continue;
            }
            assert!(
                !accesses[..i].iter().any(|b| b.id == a.id),
                "query names component id {} twice",
                a.id
            );
        }
        let unmatchable = accesses.iter().any(|a| a.required && a.id == INVALID_COMPONENT);
        let matched = if unmatchable {
            Vec::new()
        } else {
            let required: Vec<ComponentId> = accesses
                .iter()
                .filter(|a| a.required)
                .map(|a| a.id)
                .collect();
            store
                .archetypes
                .iter()
                .enumerate()
                .filter(|(_, arch)| arch.key().contains_all(&required))
                .map(|(i, _)| i as u32)
                .collect()
        };
        Self {
            store,
            ids: accesses.iter().map(|a| a.id).collect(),
            matched,
            cursor: 0,
            row: 0,
            _marker: PhantomData,
        }
    }
}

impl<'w, Q: Query> Iterator for QueryIter<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let arch = *self.matched.get(self.cursor)?;
            // Safety: the iterator holds the store's exclusive borrow for
            // 'w; no structural change can happen while iterating.
            let storage = unsafe {
                let archetypes = std::ptr::addr_of_mut!((*self.store).archetypes);
                (*archetypes).as_mut_ptr().add(arch as usize)
            };
            let len = unsafe { (*storage).len() };
            if self.row < len {
                let row = self.row;
                self.row += 1;
                // Safety: row < len; each (archetype, row) is visited once.
                let entity = unsafe { (*storage).entity_at(row) };
                let item = unsafe { Q::fetch(storage, row, &self.ids) };
                return Some((entity, item));
            }
            self.cursor += 1;
            self.row = 0;
        }
    }
}
