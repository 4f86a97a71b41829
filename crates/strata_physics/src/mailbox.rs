// mailbox.rs - Single-slot atomic carrier
//
// Conveys ownership of a payload between exactly two threads. `store`
// replaces the occupant (dropping the previous one), `take` swaps the slot
// empty. Skipped payloads are intentional: each side only ever wants the
// latest value from the other.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

pub struct Mailbox<T> {
    slot: AtomicPtr<T>,
}

// Safety: the payload crosses threads whole; T: Send is required below.
unsafe impl<T: Send> Send for Mailbox<T> {}
unsafe impl<T: Send> Sync for Mailbox<T> {}

impl<T: Send> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Replace the occupant; any previous value is dropped.
    pub fn store(&self, value: T) {
        let fresh = Box::into_raw(Box::new(value));
        let previous = self.slot.swap(fresh, Ordering::AcqRel);
        if !previous.is_null() {
            // Safety: pointers in the slot always come from Box::into_raw.
            drop(unsafe { Box::from_raw(previous) });
        }
    }

    /// Take the occupant, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        let previous = self.slot.swap(ptr::null_mut(), Ordering::AcqRel);
        if previous.is_null() {
            None
        } else {
            // Safety: pointers in the slot always come from Box::into_raw.
            Some(*unsafe { Box::from_raw(previous) })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.load(Ordering::Acquire).is_null()
    }
}

impl<T: Send> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Mailbox<T> {
    fn drop(&mut self) {
        let previous = self.slot.swap(ptr::null_mut(), Ordering::AcqRel);
        if !previous.is_null() {
            // Safety: see `take`.
            drop(unsafe { Box::from_raw(previous) });
        }
    }
}
