//! Per-thread pools, one for each element type.
//!
//! The first use of a type on a thread creates that thread's pool for the type, registered with
//! [`Channel::global()`][crate::Channel::global]. No locking is involved in any operation. The
//! pools of a thread are dropped when the thread exits.
//!
//! A slot must be returned on the thread that got it. Slots of types that are not `Send` cannot
//! leave the thread anyway; returning a slot on another thread panics because the pool there is
//! a different pool.
//!
//! ```
//! use slot_pool::{construct, destruct, local};
//!
//! let mut slot = local::get::<String>();
//! construct(&mut slot, "per-thread".to_string());
//!
//! assert_eq!(slot.value(), "per-thread");
//!
//! destruct(&mut slot);
//! local::ret(slot);
//! ```

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::num::NonZero;
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};

use crate::error::Result;
use crate::{DEFAULT_BLOCK_SIZE, Error, Mem, Slot, SlotPool};

type PoolCell<T> = Rc<RefCell<SlotPool<T>>>;

thread_local! {
    // Each value is a `PoolCell<T>` for the `T` whose `TypeId` is the key.
    static POOLS: RefCell<HashMap<TypeId, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Gets an uninitialized slot from this thread's pool of `T`.
///
/// Creates the pool with the default block size if this is the first use of `T` on this thread.
#[must_use]
pub fn get<T: 'static>() -> Slot<T> {
    with_pool(SlotPool::get)
}

/// Returns a slot to this thread's pool of `T`.
///
/// Any value still held by the slot is abandoned without running its destructor.
///
/// # Panics
///
/// Panics if the slot was not issued by this thread's pool of `T`.
pub fn ret<T: 'static>(slot: Slot<T>) {
    with_pool(|pool| pool.ret(slot));
}

/// Creates this thread's pool of `T` with a specific block size and allocates its first block.
///
/// # Errors
///
/// Returns [`Error::AlreadyCreated`] if the pool already exists on this thread, in which case
/// the pool is left as it is.
pub fn warm_up<T: 'static>(block_size: NonZero<usize>) -> Result<()> {
    let (pool, created) = find_or_create::<T>(block_size);

    if !created {
        return Err(Error::AlreadyCreated {
            type_name: type_name::<T>(),
            requested_block_size: block_size,
        });
    }

    pool.borrow_mut().reserve(block_size.get());

    Ok(())
}

/// Calls `f` with exclusive access to this thread's pool of `T`.
///
/// Creates the pool with the default block size if this is the first use of `T` on this thread.
///
/// # Panics
///
/// Panics if called from within `f` for the same `T`.
pub fn with_pool<T: 'static, R>(f: impl FnOnce(&mut SlotPool<T>) -> R) -> R {
    let (cell, _) = find_or_create::<T>(DEFAULT_BLOCK_SIZE);

    let mut pool = cell.try_borrow_mut().unwrap_or_else(|_| {
        panic!(
            "thread-local pool of {} is already being accessed on this thread",
            type_name::<T>()
        )
    });

    f(&mut pool)
}

/// Gets an uninitialized `SIZE`-byte buffer from this thread's pool of [`Mem<SIZE>`].
#[must_use]
pub fn get_mem<const SIZE: usize>() -> Slot<Mem<SIZE>> {
    let () = Mem::<SIZE>::ASSERT_NON_EMPTY;

    get::<Mem<SIZE>>()
}

/// Warms up this thread's pool of [`Mem<SIZE>`], see [`warm_up()`].
///
/// # Errors
///
/// Returns [`Error::AlreadyCreated`] if the pool already exists on this thread.
pub fn warm_up_mem<const SIZE: usize>(block_size: NonZero<usize>) -> Result<()> {
    let () = Mem::<SIZE>::ASSERT_NON_EMPTY;

    warm_up::<Mem<SIZE>>(block_size)
}

/// Returns this thread's pool of `T` and whether it was created by this call.
fn find_or_create<T: 'static>(block_size: NonZero<usize>) -> (PoolCell<T>, bool) {
    POOLS.with_borrow_mut(|pools| {
        if let Some(existing) = pools.get(&TypeId::of::<T>()) {
            let pool = existing
                .downcast_ref::<PoolCell<T>>()
                .expect("pools are keyed by the TypeId of their element type");

            return (Rc::clone(pool), false);
        }

        let pool: PoolCell<T> = Rc::new(RefCell::new(
            SlotPool::builder().block_size(block_size).build(),
        ));

        pools.insert(TypeId::of::<T>(), Box::new(Rc::clone(&pool)));

        (pool, true)
    })
}
