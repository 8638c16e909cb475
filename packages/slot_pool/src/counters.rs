use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU64};

use crate::PoolId;

/// Read access to the counters of one pool, independent of the pool's element type.
///
/// This is what a [`Channel`][crate::Channel] hands to its observer for each pool. The values
/// may be read from any thread while the pool is in use on another, so they are only ever
/// a recent approximation of the pool's state.
pub trait PoolStats: Send + Sync {
    /// Cumulative number of slots ever made available by the pool (sum of all block sizes).
    fn total_count(&self) -> u64;

    /// Number of slots currently handed out by the pool.
    fn use_count(&self) -> u64;
}

/// We use `Relaxed` ordering because the counters are independent gauges that are only ever
/// read for diagnostics. Nothing synchronizes through them.
const COUNTER_ORDERING: atomic::Ordering = atomic::Ordering::Relaxed;

/// The counters of a pool, written by the pool and readable by anyone holding a reference.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    total: AtomicU64,
    in_use: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn record_block(&self, slots: usize) {
        let slots = u64::try_from(slots).expect("a block cannot hold more than u64::MAX slots");
        self.total.fetch_add(slots, COUNTER_ORDERING);
    }

    pub(crate) fn record_get(&self) {
        self.in_use.fetch_add(1, COUNTER_ORDERING);
    }

    pub(crate) fn record_ret(&self) {
        // Only the owning pool writes, so a plain load-store pair cannot lose updates.
        let previous = self.in_use.load(COUNTER_ORDERING);

        let next = previous
            .checked_sub(1)
            .expect("slot returned while no slots were in use - handles are only issued by get()");

        self.in_use.store(next, COUNTER_ORDERING);
    }
}

impl PoolStats for PoolCounters {
    fn total_count(&self) -> u64 {
        self.total.load(COUNTER_ORDERING)
    }

    fn use_count(&self) -> u64 {
        self.in_use.load(COUNTER_ORDERING)
    }
}

/// A type-erased reference to one live pool, as announced through a [`Channel`][crate::Channel].
///
/// Cloning is cheap. The counters stay readable even after the pool itself is gone, so holding
/// on to a `PoolRef` for too long yields stale (but never invalid) data.
#[derive(Clone)]
pub struct PoolRef {
    id: PoolId,
    stats: Arc<dyn PoolStats>,
}

impl PoolRef {
    /// Creates a reference from a pool identity and its counters.
    ///
    /// Pools create these for themselves. This is public to allow custom [`PoolStats`]
    /// sources to be announced, e.g. when testing observers.
    #[must_use]
    pub fn new(id: PoolId, stats: Arc<dyn PoolStats>) -> Self {
        Self { id, stats }
    }

    /// The identity of the pool.
    #[must_use]
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The counters of the pool.
    #[must_use]
    pub fn stats(&self) -> &Arc<dyn PoolStats> {
        &self.stats
    }
}

impl fmt::Debug for PoolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRef")
            .field("id", &self.id)
            .field("total_count", &self.stats.total_count())
            .field("use_count", &self.stats.use_count())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolCounters: Send, Sync);
    assert_impl_all!(PoolRef: Send, Sync, Clone);

    #[test]
    fn counters_track_blocks_and_use() {
        let counters = PoolCounters::default();

        counters.record_block(4);
        counters.record_block(4);
        counters.record_get();
        counters.record_get();
        counters.record_ret();

        assert_eq!(counters.total_count(), 8);
        assert_eq!(counters.use_count(), 1);
    }

    #[test]
    #[should_panic]
    fn ret_without_get_panics() {
        let counters = PoolCounters::default();
        counters.record_ret();
    }

    #[test]
    fn pool_ref_reads_through_to_counters() {
        let counters = Arc::new(PoolCounters::default());
        let pool_ref = PoolRef::new(PoolId::generate(), Arc::clone(&counters) as Arc<dyn PoolStats>);

        counters.record_block(16);
        counters.record_get();

        assert_eq!(pool_ref.stats().total_count(), 16);
        assert_eq!(pool_ref.stats().use_count(), 1);
    }
}
