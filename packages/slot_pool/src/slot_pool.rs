use std::any::type_name;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::{
    Block, Channel, ElementType, PoolCounters, PoolId, PoolRef, PoolStats, Slot, SlotCoordinates,
    SlotPoolBuilder,
};

/// An object pool of unbounded size that hands out uninitialized slots of storage for `T`.
///
/// Storage is allocated in blocks of a fixed number of slots. A block is never released while
/// the pool exists, so the address of a slot remains stable for as long as the [`Slot`] handle
/// to it exists. Released slots are kept on a free list and reused before any fresh slot is
/// issued, most recently released first.
///
/// The pool never constructs or destructs items - see [`construct()`][1] and [`destruct()`][2]
/// for placing values into slots.
///
/// # Statistics
///
/// Every pool announces itself to a [`Channel`] when created and when dropped, which allows a
/// [`Monitor`][3] to report the number of allocated and in-use slots of all pools in the process.
///
/// # Thread safety
///
/// The pool itself performs no synchronization and all operations take `&mut self`. The pool can
/// be moved to another thread when `T` is `Send`. For a process-wide pool that can be used from
/// any thread, see the [`shared`][4] accessors; for a per-thread pool, see [`local`][5].
///
/// # Example
///
/// ```
/// use slot_pool::{SlotPool, construct, destruct};
///
/// let mut pool = SlotPool::<u64>::new();
///
/// let mut slot = pool.get();
/// construct(&mut slot, 42);
/// assert_eq!(*slot.value(), 42);
///
/// assert_eq!(pool.use_count(), 1);
/// assert_eq!(pool.total_count(), pool.block_size().get() as u64);
///
/// destruct(&mut slot);
/// pool.ret(slot);
/// assert_eq!(pool.use_count(), 0);
/// ```
///
/// [1]: crate::construct
/// [2]: crate::destruct
/// [3]: crate::Monitor
/// [4]: crate::shared
/// [5]: crate::local
pub struct SlotPool<T> {
    /// Every block ever allocated by the pool. All blocks have `block_size` slots.
    blocks: Vec<Block<T>>,

    /// Slots that have been issued and returned since, most recently returned last.
    free: Vec<SlotCoordinates>,

    /// The next slot that has never been issued. May point one past the last block,
    /// in which case a new block is allocated when the slot is needed.
    next_fresh: SlotCoordinates,

    block_size: NonZero<usize>,

    id: PoolId,
    element: ElementType,
    counters: Arc<PoolCounters>,
    channel: Arc<Channel>,
}

impl<T: 'static> SlotPool<T> {
    /// Creates a new pool with the default configuration, registered with [`Channel::global()`].
    ///
    /// The pool starts empty and allocates its first block when the first slot is requested.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`SlotPool`].
    ///
    /// Use this when you want to customize the block size or the channel the pool reports to.
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn new_inner(block_size: NonZero<usize>, channel: Arc<Channel>) -> Self {
        let pool = Self {
            blocks: Vec::new(),
            free: Vec::new(),
            next_fresh: SlotCoordinates::from_parts(0, 0),
            block_size,
            id: PoolId::generate(),
            element: ElementType::of::<T>(),
            counters: Arc::new(PoolCounters::default()),
            channel,
        };

        debug!(
            element = pool.element.name(),
            pool_id = pool.id.get(),
            block_size = pool.block_size.get(),
            "created slot pool"
        );

        pool.channel.created(pool.element, &pool.pool_ref());

        pool
    }

    /// A pool that reports to a channel of its own, keeping tests away from the global one.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn isolated() -> Self {
        Self::builder().channel(&Arc::new(Channel::new())).build()
    }
}

impl<T> SlotPool<T> {
    /// Issues an uninitialized slot from the pool.
    ///
    /// Returned slots are reused before fresh slots are issued. If no slot is available, the pool
    /// grows by one block.
    ///
    /// The slot does not hold a value - use [`construct()`][crate::construct] to place one.
    #[must_use]
    pub fn get(&mut self) -> Slot<T> {
        let coordinates = match self.free.pop() {
            Some(coordinates) => coordinates,
            None => self.take_fresh(),
        };

        let ptr = self
            .blocks
            .get(coordinates.block_index())
            .expect("slot coordinates only ever refer to blocks that have been allocated")
            .slot_ptr(coordinates.index_in_block());

        self.counters.record_get();

        Slot::new(self.id, coordinates, ptr)
    }

    /// Returns a slot to the pool, making it available for reuse.
    ///
    /// This does not drop any value held by the slot. If the slot still holds a value, the value
    /// is abandoned and its destructor never runs. Call [`destruct()`][crate::destruct] first if
    /// that matters.
    ///
    /// # Panics
    ///
    /// Panics if the slot was issued by a different pool.
    pub fn ret(&mut self, slot: Slot<T>) {
        assert!(
            slot.pool_id() == self.id,
            "slot of {} issued by pool {} returned to pool {}",
            type_name::<T>(),
            slot.pool_id(),
            self.id
        );

        self.free.push(slot.coordinates());
        self.counters.record_ret();
    }

    /// Ensures that at least `additional` more slots can be issued without the pool growing.
    ///
    /// The pool grows in whole blocks, so it may reserve more than requested.
    /// Does nothing if enough slots are already available.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn reserve(&mut self, additional: usize) {
        let available = self
            .free
            .len()
            .checked_add(self.fresh_remaining())
            .expect("available slot count cannot exceed the number of allocated slots");

        let Some(missing) = additional.checked_sub(available).filter(|m| *m > 0) else {
            return;
        };

        for _ in 0..missing.div_ceil(self.block_size.get()) {
            self.grow();
        }
    }

    /// The number of slots allocated by the pool over its lifetime, in use or not.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.counters.total_count()
    }

    /// The number of slots currently issued and not yet returned.
    #[must_use]
    pub fn use_count(&self) -> u64 {
        self.counters.use_count()
    }

    /// The number of slots allocated whenever the pool grows.
    #[must_use]
    pub fn block_size(&self) -> NonZero<usize> {
        self.block_size
    }

    /// The process-unique identity of the pool.
    #[must_use]
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The element type of the pool.
    #[must_use]
    pub fn element(&self) -> ElementType {
        self.element
    }

    fn pool_ref(&self) -> PoolRef {
        PoolRef::new(self.id, Arc::clone(&self.counters) as Arc<dyn PoolStats>)
    }

    fn take_fresh(&mut self) -> SlotCoordinates {
        let coordinates = self.next_fresh;

        if coordinates.block_index() == self.blocks.len() {
            self.grow();
        }

        let next_index_in_block = coordinates
            .index_in_block()
            .checked_add(1)
            .expect("index in block is always less than the block size");

        self.next_fresh = if next_index_in_block == self.block_size.get() {
            SlotCoordinates::from_parts(
                coordinates
                    .block_index()
                    .checked_add(1)
                    .expect("block count cannot overflow - memory would run out long before"),
                0,
            )
        } else {
            SlotCoordinates::from_parts(coordinates.block_index(), next_index_in_block)
        };

        coordinates
    }

    /// The number of never-issued slots in the blocks allocated so far.
    fn fresh_remaining(&self) -> usize {
        let allocated_blocks_ahead = self
            .blocks
            .len()
            .checked_sub(self.next_fresh.block_index())
            .expect("the fresh slot cursor never moves more than one past the last block");

        if allocated_blocks_ahead == 0 {
            return 0;
        }

        allocated_blocks_ahead
            .checked_mul(self.block_size.get())
            .and_then(|slots| slots.checked_sub(self.next_fresh.index_in_block()))
            .expect("allocated slot count cannot overflow - memory would run out long before")
    }

    fn grow(&mut self) {
        self.blocks.push(Block::new(self.block_size));
        self.counters.record_block(self.block_size.get());

        trace!(
            element = self.element.name(),
            pool_id = self.id.get(),
            blocks = self.blocks.len(),
            "slot pool grew by one block"
        );
    }
}

impl<T: 'static> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("id", &self.id)
            .field("block_size", &self.block_size)
            .field("blocks", &self.blocks.len())
            .field("free", &self.free.len())
            .field("total_count", &self.counters.total_count())
            .field("use_count", &self.counters.use_count())
            .finish()
    }
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        self.channel.deleted(self.element, &self.pool_ref());

        let outstanding = self.counters.use_count();

        if outstanding > 0 {
            warn!(
                element = self.element.name(),
                pool_id = self.id.get(),
                outstanding,
                "slot pool dropped while slots were still in use - leaking its memory"
            );

            // Outstanding handles keep pointing into the blocks, so they must never be released.
            mem::forget(mem::take(&mut self.blocks));
        } else {
            debug!(
                element = self.element.name(),
                pool_id = self.id.get(),
                "dropped slot pool"
            );
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{Monitor, construct, destruct};

    assert_impl_all!(SlotPool<u32>: Send);
    assert_not_impl_any!(SlotPool<Rc<u32>>: Send);
    assert_not_impl_any!(SlotPool<Cell<u32>>: Sync);

    fn pool_with_block_size<T: 'static>(block_size: usize) -> SlotPool<T> {
        SlotPool::builder()
            .block_size(NonZero::new(block_size).unwrap())
            .channel(&Arc::new(Channel::new()))
            .build()
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = SlotPool::<u32>::isolated();

        assert_eq!(pool.total_count(), 0);
        assert_eq!(pool.use_count(), 0);
        assert_eq!(pool.block_size(), crate::DEFAULT_BLOCK_SIZE);
        assert_eq!(pool.element(), ElementType::of::<u32>());
    }

    #[test]
    fn grows_in_whole_blocks() {
        let mut pool = pool_with_block_size::<u64>(3);

        let slots = (0..7).map(|_| pool.get()).collect::<Vec<_>>();

        assert_eq!(pool.total_count(), 9);
        assert_eq!(pool.use_count(), 7);

        for slot in slots {
            pool.ret(slot);
        }

        assert_eq!(pool.total_count(), 9);
        assert_eq!(pool.use_count(), 0);
    }

    #[test]
    fn issued_slots_are_distinct() {
        let mut pool = pool_with_block_size::<u64>(2);

        let slots = (0..5).map(|_| pool.get()).collect::<Vec<_>>();

        for (i, a) in slots.iter().enumerate() {
            for b in slots.iter().skip(i + 1) {
                assert_ne!(a.ptr(), b.ptr());
            }
        }

        for slot in slots {
            pool.ret(slot);
        }
    }

    #[test]
    fn returned_slots_are_reused_most_recent_first() {
        let mut pool = pool_with_block_size::<u32>(8);

        let a = pool.get();
        let b = pool.get();
        let a_ptr = a.ptr();
        let b_ptr = b.ptr();

        pool.ret(a);
        pool.ret(b);

        let first = pool.get();
        let second = pool.get();
        assert_eq!(first.ptr(), b_ptr);
        assert_eq!(second.ptr(), a_ptr);

        pool.ret(first);
        pool.ret(second);
    }

    #[test]
    fn block_size_four_scenario() {
        let mut pool = pool_with_block_size::<u64>(4);

        // Equivalent to warming up: the first block exists before the first slot is issued.
        pool.reserve(4);
        assert_eq!(pool.total_count(), 4);

        let mut slots = (0..8).map(|_| pool.get()).collect::<Vec<_>>();

        // The second block was the only growth.
        assert_eq!(pool.total_count(), 8);
        assert_eq!(pool.use_count(), 8);

        let released = slots.split_off(4);
        let released_ptrs = released.iter().map(Slot::ptr).collect::<Vec<_>>();

        for slot in released {
            pool.ret(slot);
        }
        assert_eq!(pool.use_count(), 4);

        let reissued = (0..4).map(|_| pool.get()).collect::<Vec<_>>();
        let reissued_ptrs = reissued.iter().map(Slot::ptr).collect::<Vec<_>>();

        let mut expected = released_ptrs;
        expected.reverse();
        assert_eq!(reissued_ptrs, expected);

        assert_eq!(pool.total_count(), 8);
        assert_eq!(pool.use_count(), 8);

        for slot in slots.into_iter().chain(reissued) {
            pool.ret(slot);
        }
    }

    #[test]
    fn reserve_counts_free_and_fresh_slots() {
        let mut pool = pool_with_block_size::<u8>(4);

        pool.reserve(0);
        assert_eq!(pool.total_count(), 0);

        pool.reserve(5);
        assert_eq!(pool.total_count(), 8);

        let slots = (0..6).map(|_| pool.get()).collect::<Vec<_>>();
        assert_eq!(pool.total_count(), 8);

        // Two fresh slots remain in the second block.
        pool.reserve(2);
        assert_eq!(pool.total_count(), 8);

        pool.reserve(3);
        assert_eq!(pool.total_count(), 12);

        for slot in slots {
            pool.ret(slot);
        }

        // Six free slots plus six fresh slots.
        pool.reserve(12);
        assert_eq!(pool.total_count(), 12);
    }

    #[test]
    fn reserved_blocks_are_consumed_before_growing() {
        let mut pool = pool_with_block_size::<u16>(2);

        pool.reserve(6);
        assert_eq!(pool.total_count(), 6);

        let slots = (0..6).map(|_| pool.get()).collect::<Vec<_>>();
        assert_eq!(pool.total_count(), 6);

        let extra = pool.get();
        assert_eq!(pool.total_count(), 8);

        for slot in slots {
            pool.ret(slot);
        }
        pool.ret(extra);
    }

    #[test]
    fn values_survive_growth() {
        let mut pool = pool_with_block_size::<String>(2);

        let mut slots = Vec::new();
        for i in 0..9 {
            let mut slot = pool.get();
            construct(&mut slot, i.to_string());
            slots.push(slot);
        }

        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.value(), &i.to_string());
        }

        for mut slot in slots {
            destruct(&mut slot);
            pool.ret(slot);
        }
    }

    #[test]
    #[should_panic]
    fn ret_to_foreign_pool_panics() {
        let mut a = SlotPool::<u32>::isolated();
        let mut b = SlotPool::<u32>::isolated();

        let slot = a.get();
        b.ret(slot);
    }

    #[test]
    #[cfg_attr(miri, ignore = "intentionally leaks the blocks of the dropped pool")]
    fn outstanding_slot_outlives_pool() {
        let mut pool = SlotPool::<String>::isolated();

        let mut slot = pool.get();
        construct(&mut slot, "still here".to_string());

        drop(pool);

        assert_eq!(slot.value(), "still here");
        destruct(&mut slot);
    }

    #[test]
    fn reports_to_configured_channel() {
        let channel = Arc::new(Channel::new());
        let monitor = Monitor::attach(&channel);

        let mut pool = SlotPool::<u32>::builder()
            .block_size(NonZero::new(16).unwrap())
            .channel(&channel)
            .build();

        let slot = pool.get();

        let stats = monitor.stat();
        let u32_stats = stats.get::<u32>().unwrap();
        assert_eq!(u32_stats.pool_count(), 1);
        assert_eq!(u32_stats.total_count(), 16);
        assert_eq!(u32_stats.use_count(), 1);

        pool.ret(slot);
        drop(pool);

        assert!(monitor.stat().is_empty());
    }

    #[test]
    fn pool_can_move_between_threads() {
        let mut pool = pool_with_block_size::<u64>(4);
        let mut slot = pool.get();
        construct(&mut slot, 11);

        let (pool, slot) = thread::spawn(move || {
            assert_eq!(*slot.value(), 11);
            (pool, slot)
        })
        .join()
        .unwrap();

        let mut pool = pool;
        pool.ret(slot);
        assert_eq!(pool.use_count(), 0);
    }
}
