//! Explicit construction and destruction of values in pooled slots.
//!
//! Pools only manage storage. Whether and when a value lives in a slot is up to the caller,
//! which allows trivially copyable data to reuse slots without any initialization cost while
//! still supporting types with meaningful constructors and destructors.

use std::mem::MaybeUninit;
use std::ptr;

use crate::Slot;

/// Moves `value` into the slot storage, returning a reference to it.
///
/// # Panics
///
/// Panics if the slot already holds a value.
///
/// # Example
///
/// ```
/// use slot_pool::{SlotPool, construct, destruct};
///
/// let mut pool = SlotPool::<Vec<u8>>::new();
/// let mut slot = pool.get();
///
/// construct(&mut slot, vec![1, 2, 3]).push(4);
/// assert_eq!(slot.value(), &[1, 2, 3, 4]);
///
/// destruct(&mut slot);
/// pool.ret(slot);
/// ```
pub fn construct<T>(slot: &mut Slot<T>, value: T) -> &mut T {
    slot.assert_vacant("construct()");

    // SAFETY: The storage is valid for writes of `T` and the slot handle is its exclusive owner.
    // There is no live value in the slot (checked above), so nothing is overwritten without
    // being dropped.
    unsafe {
        slot.ptr().write(value);
    }

    slot.set_constructed(true);
    slot.value_mut()
}

/// Initializes the slot storage in place via a callback.
///
/// This avoids building the value on the stack first, which matters for large types.
///
/// # Safety
///
/// The callback must fully initialize the `MaybeUninit<T>` before returning.
///
/// # Panics
///
/// Panics if the slot already holds a value.
///
/// # Example
///
/// ```
/// use slot_pool::{Mem, SlotPool, construct_with};
///
/// let mut pool = SlotPool::<Mem<4096>>::new();
/// let mut slot = pool.get();
///
/// // SAFETY: We fully initialize the buffer.
/// unsafe {
///     construct_with(&mut slot, |uninit| {
///         uninit.write(Mem::zeroed());
///     });
/// }
///
/// assert_eq!(slot.value().as_bytes()[4095], 0);
/// pool.ret(slot);
/// ```
pub unsafe fn construct_with<T>(slot: &mut Slot<T>, f: impl FnOnce(&mut MaybeUninit<T>)) -> &mut T {
    f(slot.as_uninit_mut());

    slot.set_constructed(true);
    slot.value_mut()
}

/// Drops the value in the slot without releasing the slot storage.
///
/// # Panics
///
/// Panics if the slot does not hold a value.
pub fn destruct<T>(slot: &mut Slot<T>) {
    slot.assert_constructed("destruct()");

    // Mark first - if the destructor panics, the value is considered gone either way.
    slot.set_constructed(false);

    // SAFETY: The slot held a valid `T` (checked above) that only we can access, and we
    // marked it as vacant so it will never be accessed or dropped again.
    unsafe {
        ptr::drop_in_place(slot.ptr().as_ptr());
    }
}

/// Moves the value out of the slot, leaving the slot storage vacant.
///
/// # Panics
///
/// Panics if the slot does not hold a value.
#[must_use]
pub fn take<T>(slot: &mut Slot<T>) -> T {
    slot.assert_constructed("take()");

    slot.set_constructed(false);

    // SAFETY: The slot held a valid `T` (checked above) and we marked it as vacant,
    // so the bits left behind will never be treated as a value again.
    unsafe { slot.ptr().read() }
}
