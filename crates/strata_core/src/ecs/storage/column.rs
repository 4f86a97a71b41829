// column.rs - Untyped component column
//
// Each column stores all instances of a single component type for one
// archetype in a Structure-of-Arrays layout. The column only knows the
// component's layout vtable; element count lives in the owning storage so
// all parallel columns agree on it.

use crate::ecs::ComponentInfo;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

pub(crate) struct Column {
    info: ComponentInfo,
    data: NonNull<u8>,
    cap: usize,
}

// Safety: columns only ever hold values of registered component types,
// which are bounded `Send + Sync`.
unsafe impl Send for Column {}
unsafe impl Sync for Column {}

impl Column {
    pub fn new(info: ComponentInfo) -> Self {
        Self {
            info,
            data: NonNull::dangling(),
            cap: 0,
        }
    }

    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn array_layout(&self, cap: usize) -> Layout {
        let size = self
            .info
            .size()
            .checked_mul(cap)
            .expect("column allocation overflows usize");
        Layout::from_size_align(size, self.info.layout.align())
            .expect("column layout invalid")
    }

    /// Grow the allocation to hold `new_cap` elements, preserving the first
    /// `len` of them. Zero-sized types never allocate.
    pub fn grow_to(&mut self, new_cap: usize, len: usize) {
        debug_assert!(new_cap >= self.cap);
        if self.info.size() == 0 || new_cap == self.cap {
            self.cap = new_cap;
            return;
        }
        let new_layout = self.array_layout(new_cap);
        // Safety: layout has non-zero size here.
        let fresh = unsafe { alloc(new_layout) };
        let Some(fresh) = NonNull::new(fresh) else {
            handle_alloc_error(new_layout);
        };
        if self.cap > 0 {
            // Safety: both regions are valid for `len` elements and disjoint.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.data.as_ptr(),
                    fresh.as_ptr(),
                    len * self.info.size(),
                );
                dealloc(self.data.as_ptr(), self.array_layout(self.cap));
            }
        }
        self.data = fresh;
        self.cap = new_cap;
    }

    /// Raw pointer to the element slot at `row`.
    ///
    /// # Safety
    /// `row` must be within the current capacity; the caller is responsible
    /// for not creating aliasing references through the result.
    pub unsafe fn ptr_at(&self, row: usize) -> *mut u8 {
        debug_assert!(row < self.cap || self.info.size() == 0);
        if self.info.size() == 0 {
            // Any well-aligned non-null pointer is valid for a ZST.
            self.info.layout.align() as *mut u8
        } else {
            self.data.as_ptr().add(row * self.info.size())
        }
    }

    /// Copy one element's bytes from `src` into `row`. Ownership of the
    /// value transfers to the column.
    ///
    /// # Safety
    /// `src` must point at a valid value of the column's component type and
    /// must not be dropped by the caller afterwards. The slot at `row` must
    /// be vacant (uninitialized or moved out).
    pub unsafe fn write_from(&mut self, row: usize, src: *const u8) {
        std::ptr::copy_nonoverlapping(src, self.ptr_at(row), self.info.size());
    }

    /// Bitwise-move the element at `from` into the slot at `to`.
    ///
    /// # Safety
    /// `from` must hold a live value, the slot at `to` must be vacant.
    pub unsafe fn move_row(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let src = self.ptr_at(from);
        let dst = self.ptr_at(to);
        std::ptr::copy_nonoverlapping(src, dst, self.info.size());
    }

    /// Drop the value at `row` in place, leaving the slot vacant.
    ///
    /// # Safety
    /// `row` must hold a live value.
    pub unsafe fn drop_at(&mut self, row: usize) {
        if let Some(drop_fn) = self.info.drop_fn {
            drop_fn(self.ptr_at(row));
        }
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        // Live elements are dropped by the owning ArchetypeStorage, which
        // knows the row count; the column only releases its allocation.
        if self.cap > 0 && self.info.size() > 0 {
            unsafe { dealloc(self.data.as_ptr(), self.array_layout(self.cap)) };
        }
    }
}
