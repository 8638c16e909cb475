//! Process-wide pools, one for each element type, usable from any thread.
//!
//! The first use of a type anywhere in the process creates its pool, registered with
//! [`Channel::global()`][crate::Channel::global]. Concurrent first uses of the same type create
//! the pool exactly once. Each pool is protected by its own lock, so threads working with
//! different types do not contend with each other.
//!
//! Shared pools live until the process exits.
//!
//! ```
//! use std::thread;
//!
//! use slot_pool::{construct, shared};
//!
//! let mut slot = shared::get::<u64>();
//! construct(&mut slot, 1234);
//!
//! // The slot can be returned from any thread.
//! thread::spawn(move || {
//!     assert_eq!(*slot.value(), 1234);
//!     shared::ret(slot);
//! })
//! .join()
//! .unwrap();
//! ```

use std::any::{Any, TypeId, type_name};
use std::num::NonZero;
use std::sync::LazyLock;

use foldhash::{HashMap, HashMapExt};
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::{DEFAULT_BLOCK_SIZE, Error, Mem, Slot, SlotPool};

type PoolLock<T> = Mutex<SlotPool<T>>;

// Each value is a leaked `PoolLock<T>` for the `T` whose `TypeId` is the key.
static POOLS: LazyLock<RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Gets an uninitialized slot from the process-wide pool of `T`.
///
/// Creates the pool with the default block size if this is the first use of `T` in the process.
#[must_use]
pub fn get<T: Send + 'static>() -> Slot<T> {
    with_pool(SlotPool::get)
}

/// Returns a slot to the process-wide pool of `T`, from any thread.
///
/// Any value still held by the slot is abandoned without running its destructor.
///
/// # Panics
///
/// Panics if the slot was not issued by the process-wide pool of `T`.
pub fn ret<T: Send + 'static>(slot: Slot<T>) {
    with_pool(|pool| pool.ret(slot));
}

/// Creates the process-wide pool of `T` with a specific block size and allocates its first block.
///
/// # Errors
///
/// Returns [`Error::AlreadyCreated`] if the pool already exists, in which case the pool is left
/// as it is.
pub fn warm_up<T: Send + 'static>(block_size: NonZero<usize>) -> Result<()> {
    let (pool, created) = find_or_create::<T>(block_size);

    if !created {
        return Err(Error::AlreadyCreated {
            type_name: type_name::<T>(),
            requested_block_size: block_size,
        });
    }

    pool.lock().reserve(block_size.get());

    Ok(())
}

/// Calls `f` with exclusive access to the process-wide pool of `T`.
///
/// The pool stays locked for the duration of `f`, blocking other threads that use pools of `T`.
///
/// # Deadlocks
///
/// Using the pool of `T` from within `f` (e.g. via [`get()`]) deadlocks.
pub fn with_pool<T: Send + 'static, R>(f: impl FnOnce(&mut SlotPool<T>) -> R) -> R {
    let (pool, _) = find_or_create::<T>(DEFAULT_BLOCK_SIZE);

    f(&mut pool.lock())
}

/// Gets an uninitialized `SIZE`-byte buffer from the process-wide pool of [`Mem<SIZE>`].
#[must_use]
pub fn get_mem<const SIZE: usize>() -> Slot<Mem<SIZE>> {
    let () = Mem::<SIZE>::ASSERT_NON_EMPTY;

    get::<Mem<SIZE>>()
}

/// Warms up the process-wide pool of [`Mem<SIZE>`], see [`warm_up()`].
///
/// # Errors
///
/// Returns [`Error::AlreadyCreated`] if the pool already exists.
pub fn warm_up_mem<const SIZE: usize>(block_size: NonZero<usize>) -> Result<()> {
    let () = Mem::<SIZE>::ASSERT_NON_EMPTY;

    warm_up::<Mem<SIZE>>(block_size)
}

/// Returns the process-wide pool of `T` and whether it was created by this call.
fn find_or_create<T: Send + 'static>(
    block_size: NonZero<usize>,
) -> (&'static PoolLock<T>, bool) {
    let type_id = TypeId::of::<T>();

    if let Some(existing) = POOLS.read().get(&type_id) {
        return (downcast(*existing), false);
    }

    let mut pools = POOLS.write();

    // Another thread may have created the pool while we were waiting for the write lock.
    if let Some(existing) = pools.get(&type_id) {
        return (downcast(*existing), false);
    }

    let pool: &'static PoolLock<T> = Box::leak(Box::new(Mutex::new(
        SlotPool::builder().block_size(block_size).build(),
    )));

    pools.insert(type_id, pool);

    (pool, true)
}

fn downcast<T: Send + 'static>(pool: &'static (dyn Any + Send + Sync)) -> &'static PoolLock<T> {
    pool.downcast_ref::<PoolLock<T>>()
        .expect("pools are keyed by the TypeId of their element type")
}
