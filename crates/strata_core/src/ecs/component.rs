// component.rs - Component identity and layout registry
//
// Components are plain Rust value types. Each store owns a registry that
// assigns a dense ComponentId at first registration and records the layout
// vtable the untyped columns need to copy and drop values.

use crate::error::EcsError;
use std::alloc::Layout;
use std::any::TypeId;
use std::collections::HashMap;

pub type ComponentId = u32;

/// Sentinel id used by query parameters whose type was never registered.
/// No archetype can ever contain it.
pub(crate) const INVALID_COMPONENT: ComponentId = ComponentId::MAX;

/// Marker trait for component value types. Blanket-implemented; a type still
/// has to be registered with a store before it can be attached to entities.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Layout vtable for one registered component type.
#[derive(Copy, Clone)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub name: &'static str,
    pub layout: Layout,
    pub drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentInfo {
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }
}

unsafe fn drop_erased<T>(ptr: *mut u8) {
    std::ptr::drop_in_place(ptr as *mut T);
}

/// Per-store registry: TypeId -> dense id, id -> layout vtable.
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Register `T`, assigning a dense id at first use. Idempotent.
    pub fn register<T: Component>(&mut self) -> ComponentId {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return id;
        }
        let id = self.infos.len() as ComponentId;
        assert!(id < INVALID_COMPONENT, "component id space exhausted");
        let drop_fn: Option<unsafe fn(*mut u8)> = if std::mem::needs_drop::<T>() {
            Some(drop_erased::<T>)
        } else {
            None
        };
        self.infos.push(ComponentInfo {
            id,
            name: std::any::type_name::<T>(),
            layout: Layout::new::<T>(),
            drop_fn,
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        tracing::debug!(component = std::any::type_name::<T>(), id, "registered component");
        id
    }

    /// Look up the id for `T`, failing if it was never registered.
    pub fn lookup<T: Component>(&self) -> Result<ComponentId, EcsError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::InvalidComponent {
                name: std::any::type_name::<T>(),
            })
    }

    /// Id for `T` if registered, the invalid sentinel otherwise.
    /// Used by optional query parameters.
    pub(crate) fn lookup_or_invalid<T: Component>(&self) -> ComponentId {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .unwrap_or(INVALID_COMPONENT)
    }

    pub fn info(&self, id: ComponentId) -> &ComponentInfo {
        self.infos
            .get(id as usize)
            .unwrap_or_else(|| panic!("component id {id} has no registry entry"))
    }

    pub fn is_registered(&self, id: ComponentId) -> bool {
        (id as usize) < self.infos.len()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
