use std::any::type_name;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::{PoolId, SlotCoordinates};

/// Exclusive handle to one slot of storage issued by a [`SlotPool`][crate::SlotPool].
///
/// A freshly issued slot holds no value - the pool never constructs or destructs items. Use
/// [`construct()`][crate::construct] to place a value in the slot and
/// [`destruct()`][crate::destruct] to drop it again before returning the slot to its pool.
/// Returning a slot that still holds a value does not drop the value; its destructor simply
/// never runs.
///
/// The handle cannot be copied or cloned and returning it to the pool consumes it, so a slot
/// cannot be returned twice. Returning it to a pool other than the one that issued it panics.
///
/// The storage behind the handle remains valid for as long as the handle exists, even if the
/// pool is dropped first (the pool then leaks its memory instead of releasing it).
///
/// # Example
///
/// ```
/// use slot_pool::{SlotPool, construct, destruct};
///
/// let mut pool = SlotPool::<String>::new();
///
/// let mut slot = pool.get();
/// assert!(!slot.is_constructed());
///
/// construct(&mut slot, "Hello".to_string());
/// slot.value_mut().push_str(", World!");
/// assert_eq!(slot.value(), "Hello, World!");
///
/// destruct(&mut slot);
/// pool.ret(slot);
/// ```
pub struct Slot<T> {
    pool_id: PoolId,
    coordinates: SlotCoordinates,
    ptr: NonNull<T>,

    /// Whether the storage currently holds a valid `T` that we are responsible for.
    constructed: bool,
}

impl<T> Slot<T> {
    #[must_use]
    pub(crate) fn new(pool_id: PoolId, coordinates: SlotCoordinates, ptr: NonNull<T>) -> Self {
        Self {
            pool_id,
            coordinates,
            ptr,
            constructed: false,
        }
    }

    pub(crate) fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub(crate) fn coordinates(&self) -> SlotCoordinates {
        self.coordinates
    }

    pub(crate) fn set_constructed(&mut self, constructed: bool) {
        self.constructed = constructed;
    }

    /// The address of the slot storage.
    ///
    /// The address is stable for the lifetime of the handle. Reading through it is only valid
    /// while the slot [is constructed][Self::is_constructed].
    #[must_use]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Whether the slot currently holds a value.
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Shared access to the value in the slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot does not hold a value.
    #[must_use]
    pub fn value(&self) -> &T {
        self.assert_constructed("value()");

        // SAFETY: The slot holds a valid `T` (checked above) and we hold the only handle to it,
        // so the borrow of `self` covers every access to the storage.
        unsafe { self.ptr.as_ref() }
    }

    /// Exclusive access to the value in the slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot does not hold a value.
    #[must_use]
    pub fn value_mut(&mut self) -> &mut T {
        self.assert_constructed("value_mut()");

        // SAFETY: The slot holds a valid `T` (checked above) and we hold the only handle to it,
        // so the exclusive borrow of `self` covers every access to the storage.
        unsafe { self.ptr.as_mut() }
    }

    /// Raw access to the storage of an empty slot, for initializing it in place.
    ///
    /// After writing a valid `T`, mark the slot via [`assume_constructed()`][1] so that the
    /// value can be accessed and destructed through the handle.
    ///
    /// # Panics
    ///
    /// Panics if the slot already holds a value.
    ///
    /// [1]: Self::assume_constructed
    #[must_use]
    pub fn as_uninit_mut(&mut self) -> &mut MaybeUninit<T> {
        self.assert_vacant("as_uninit_mut()");

        // SAFETY: The storage is valid for `T` and `MaybeUninit<T>` has the same layout. Any bit
        // pattern is valid for `MaybeUninit`, so stale contents from earlier occupants are fine.
        unsafe { self.ptr.cast::<MaybeUninit<T>>().as_mut() }
    }

    /// Declares that the slot storage now holds a valid `T`.
    ///
    /// # Safety
    ///
    /// The caller must have initialized the storage with a valid `T`, e.g. via
    /// [`as_uninit_mut()`][Self::as_uninit_mut] or the pointer from [`ptr()`][Self::ptr].
    pub unsafe fn assume_constructed(&mut self) {
        self.constructed = true;
    }

    pub(crate) fn assert_constructed(&self, operation: &str) {
        assert!(
            self.constructed,
            "{operation} on a slot of {} that does not hold a value",
            type_name::<T>()
        );
    }

    pub(crate) fn assert_vacant(&self, operation: &str) {
        assert!(
            !self.constructed,
            "{operation} on a slot of {} that already holds a value",
            type_name::<T>()
        );
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("pool_id", &self.pool_id)
            .field("coordinates", &self.coordinates)
            .field("ptr", &self.ptr)
            .field("constructed", &self.constructed)
            .finish()
    }
}

// SAFETY: The handle is the exclusive owner of the slot storage, much like a `Box<T>`, so it can
// move between threads when `T` can.
unsafe impl<T: Send> Send for Slot<T> {}

// SAFETY: Shared access to the handle only gives out `&T`, so sharing it between threads is fine
// when sharing `T` is.
unsafe impl<T: Sync> Sync for Slot<T> {}
