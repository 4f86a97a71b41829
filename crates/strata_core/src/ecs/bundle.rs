// bundle.rs - Component bundles and type-erased payloads
//
// Bundles collect the component values of a spawn/insert before the target
// archetype is known. Each value is erased into an owned, properly aligned
// heap payload; ownership transfers into a column slot on write, or the
// payload drops the value itself if it is never consumed (e.g. a Commands
// batch whose flush failed).

use crate::ecs::component::{Component, ComponentId, ComponentRegistry};
use crate::error::EcsError;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

unsafe fn drop_erased<T>(ptr: *mut u8) {
    std::ptr::drop_in_place(ptr as *mut T);
}

/// One component value with its type erased.
pub struct ErasedComponent {
    id: ComponentId,
    layout: Layout,
    drop_fn: Option<unsafe fn(*mut u8)>,
    ptr: NonNull<u8>,
    live: bool,
}

// Safety: the payload is a value of a `Component` type, which is Send + Sync.
unsafe impl Send for ErasedComponent {}

impl ErasedComponent {
    pub fn new<T: Component>(id: ComponentId, value: T) -> Self {
        let layout = Layout::new::<T>();
        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // Safety: layout has non-zero size.
            let raw = unsafe { alloc(layout) };
            match NonNull::new(raw) {
                Some(p) => p,
                None => handle_alloc_error(layout),
            }
        };
        // Safety: freshly allocated (or dangling for ZSTs), properly aligned.
        unsafe { std::ptr::write(ptr.as_ptr() as *mut T, value) };
        Self {
            id,
            layout,
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(drop_erased::<T>)
            } else {
                None
            },
            ptr,
            live: true,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Pointer to the payload bytes.
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Release ownership of the value after its bytes were moved elsewhere.
    /// The allocation is still freed on drop; the value is not dropped.
    pub(crate) fn forget_value(mut self) {
        self.live = false;
    }
}

impl Drop for ErasedComponent {
    fn drop(&mut self) {
        if self.live {
            if let Some(drop_fn) = self.drop_fn {
                // Safety: the payload is live and properly aligned.
                unsafe { drop_fn(self.ptr.as_ptr()) };
            }
        }
        if self.layout.size() > 0 {
            // Safety: allocated with this layout in `new`.
            unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

/// A tuple of component values spawned or inserted together.
/// Values move into the store; use [`ClonedBundle`] to copy in by reference.
pub trait ComponentBundle {
    /// Erase every value, failing with `InvalidComponent` on the first
    /// unregistered type.
    fn erase(self, registry: &ComponentRegistry) -> Result<Vec<ErasedComponent>, EcsError>;
}

/// A tuple of component references whose targets are cloned into the store.
pub trait ClonedBundle {
    fn erase_cloned(&self, registry: &ComponentRegistry)
        -> Result<Vec<ErasedComponent>, EcsError>;
}

/// A tuple of component *types*, used to name component sets for removal.
pub trait ComponentSet {
    fn ids(registry: &ComponentRegistry) -> Result<Vec<ComponentId>, EcsError>;
}

macro_rules! impl_bundle {
    ($($name:ident),*) => {
        #[allow(non_snake_case, unused_variables, unused_mut)]
        impl<$($name: Component),*> ComponentBundle for ($($name,)*) {
            fn erase(
                self,
                registry: &ComponentRegistry,
            ) -> Result<Vec<ErasedComponent>, EcsError> {
                let ($($name,)*) = self;
                Ok(vec![$(ErasedComponent::new(registry.lookup::<$name>()?, $name)),*])
            }
        }

        #[allow(non_snake_case, unused_variables)]
        impl<$($name: Component + Clone),*> ClonedBundle for ($(&$name,)*) {
            fn erase_cloned(
                &self,
                registry: &ComponentRegistry,
            ) -> Result<Vec<ErasedComponent>, EcsError> {
                let ($($name,)*) = *self;
                Ok(vec![$(ErasedComponent::new(
                    registry.lookup::<$name>()?,
                    ($name).clone(),
                )),*])
            }
        }

        #[allow(unused_variables)]
        impl<$($name: Component),*> ComponentSet for ($($name,)*) {
            fn ids(registry: &ComponentRegistry) -> Result<Vec<ComponentId>, EcsError> {
                Ok(vec![$(registry.lookup::<$name>()?),*])
            }
        }
    };
}

impl_bundle!();
impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
