use std::any::type_name;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::{self, NonNull};

/// A fixed-capacity run of uninitialized slots, allocated in one go.
///
/// The block never creates references to its slots and never reads or writes slot contents.
/// It only hands out pointers, which remain valid until the block is dropped. Dropping the
/// block releases the memory without dropping whatever the slots contain.
#[derive(Debug)]
pub(crate) struct Block<T> {
    first_slot_ptr: NonNull<MaybeUninit<T>>,
    capacity: NonZero<usize>,
}

impl<T> Block<T> {
    /// Allocates a block with room for `capacity` items.
    ///
    /// Allocation failure is not handled here - it goes to the global allocation error handler.
    #[must_use]
    pub(crate) fn new(capacity: NonZero<usize>) -> Self {
        let slots: Box<[MaybeUninit<T>]> = Box::new_uninit_slice(capacity.get());

        // We take ownership of the allocation as a raw pointer, so that pointers handed out to
        // individual slots are never invalidated by us re-borrowing the whole slice.
        let first_slot_ptr = NonNull::from(Box::leak(slots)).cast::<MaybeUninit<T>>();

        Self {
            first_slot_ptr,
            capacity,
        }
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        assert!(
            index < self.capacity.get(),
            "slot {index} out of bounds in block of {} with capacity {}",
            type_name::<T>(),
            self.capacity
        );

        // SAFETY: Guarded by bounds check above, so the pointer stays inside the allocation.
        let slot = unsafe { self.first_slot_ptr.add(index) };

        slot.cast::<T>()
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        let slots = ptr::slice_from_raw_parts_mut(self.first_slot_ptr.as_ptr(), self.capacity.get());

        // SAFETY: This is the same pointer and length we obtained from `Box::leak()` in the ctor,
        // and we only ever do this once. The element type is `MaybeUninit<T>` so the slot
        // contents are not dropped, only the memory is released.
        drop(unsafe { Box::from_raw(slots) });
    }
}

// SAFETY: The block is just memory. Nothing about it is tied to a thread, so it can move between
// threads whenever the items it is meant to hold can.
unsafe impl<T: Send> Send for Block<T> {}
