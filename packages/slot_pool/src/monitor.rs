use std::fmt::{self, Display};
use std::sync::{Arc, LazyLock};

use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;

use crate::{Channel, ElementType, Observer, PoolId, PoolRef};

/// Aggregates statistics about all pools announced through a [`Channel`].
///
/// The process-wide monitor returned by [`Monitor::global()`] observes [`Channel::global()`],
/// which covers every pool created through the [`local`][1] and [`shared`][2] accessors.
///
/// # Example
///
/// ```
/// use slot_pool::{Monitor, local};
///
/// let slot = local::get::<u128>();
///
/// let stats = Monitor::global().stat();
/// let u128_stats = stats.get::<u128>().unwrap();
///
/// assert_eq!(u128_stats.pool_count(), 1);
/// assert_eq!(u128_stats.use_count(), 1);
///
/// local::ret(slot);
/// ```
///
/// [1]: crate::local
/// [2]: crate::shared
#[derive(Debug, Default)]
pub struct Monitor {
    pools: Mutex<HashMap<ElementType, HashMap<PoolId, PoolRef>>>,
}

static GLOBAL_MONITOR: LazyLock<Arc<Monitor>> =
    LazyLock::new(|| Monitor::attach(Channel::global()));

impl Monitor {
    /// Creates a monitor that is not attached to any channel.
    ///
    /// Use [`Channel::set()`] to attach it, or [`Monitor::attach()`] to do both in one step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a monitor and attaches it as the observer of `channel`.
    ///
    /// Any observer previously attached to the channel is detached.
    #[must_use]
    pub fn attach(channel: &Channel) -> Arc<Self> {
        let monitor = Arc::new(Self::new());

        _ = channel.set(Some(Arc::clone(&monitor) as Arc<dyn Observer>));

        monitor
    }

    /// The process-wide monitor, attached to [`Channel::global()`] on first use.
    #[must_use]
    pub fn global() -> &'static Arc<Self> {
        &GLOBAL_MONITOR
    }

    /// Takes a snapshot of the statistics of every pool known to the monitor.
    ///
    /// This only reads the pool counters. The pools themselves are not affected, and may be
    /// in use on other threads while the snapshot is taken.
    #[must_use]
    pub fn stat(&self) -> Stats {
        let pools = self.pools.lock();

        let mut types = pools
            .iter()
            .map(|(element, pools_of_type)| {
                let (total_count, use_count) =
                    pools_of_type
                        .values()
                        .fold((0_u64, 0_u64), |(total, in_use), pool| {
                            (
                                total.wrapping_add(pool.stats().total_count()),
                                in_use.wrapping_add(pool.stats().use_count()),
                            )
                        });

                TypeStats {
                    element: *element,
                    pool_count: pools_of_type.len(),
                    total_count,
                    use_count,
                }
            })
            .collect::<Vec<_>>();

        types.sort_by_key(|type_stats| type_stats.element.name());

        Stats {
            types: types.into_boxed_slice(),
        }
    }
}

impl Observer for Monitor {
    fn created(&self, element: ElementType, pool: &PoolRef) {
        self.pools
            .lock()
            .entry(element)
            .or_insert_with(HashMap::new)
            .insert(pool.id(), pool.clone());
    }

    fn deleted(&self, element: ElementType, pool: &PoolRef) {
        let mut pools = self.pools.lock();

        let Some(pools_of_type) = pools.get_mut(&element) else {
            return;
        };

        pools_of_type.remove(&pool.id());

        if pools_of_type.is_empty() {
            pools.remove(&element);
        }
    }
}

/// A point-in-time snapshot of pool statistics, per element type.
///
/// For human-readable output, use the `Display` trait implementation, which renders a table
/// with one numbered row per element type.
#[derive(Debug)]
pub struct Stats {
    // Sorted by type name, ascending.
    types: Box<[TypeStats]>,
}

impl Stats {
    /// The statistics for pools of element type `T`, if any such pools exist.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<&TypeStats> {
        let element = ElementType::of::<T>();

        self.types.iter().find(|type_stats| type_stats.element == element)
    }

    /// Iterates over the statistics of every element type, ordered by type name.
    pub fn iter(&self) -> impl Iterator<Item = &TypeStats> {
        self.types.iter()
    }

    /// The number of element types in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the snapshot contains no element types at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Width of the element type column in the statistics table.
const TYPE_COLUMN_WIDTH: usize = 30;

/// Width of each counter column in the statistics table.
const COUNTER_COLUMN_WIDTH: usize = 10;

impl Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4} {:<TYPE_COLUMN_WIDTH$} {:>COUNTER_COLUMN_WIDTH$} {:>COUNTER_COLUMN_WIDTH$} {:>COUNTER_COLUMN_WIDTH$}",
            "NO.", "TYPE", "POOL", "TOTAL", "USE"
        )?;

        for (index, type_stats) in self.types.iter().enumerate() {
            writeln!(
                f,
                "{:>3}. {:<TYPE_COLUMN_WIDTH$} {:>COUNTER_COLUMN_WIDTH$} {:>COUNTER_COLUMN_WIDTH$} {:>COUNTER_COLUMN_WIDTH$}",
                index.wrapping_add(1),
                type_stats.element.name(),
                type_stats.pool_count,
                type_stats.total_count,
                type_stats.use_count
            )?;
        }

        Ok(())
    }
}

/// Statistics aggregated over all pools of one element type.
#[derive(Clone, Copy, Debug)]
pub struct TypeStats {
    element: ElementType,
    pool_count: usize,
    total_count: u64,
    use_count: u64,
}

impl TypeStats {
    /// The element type these statistics are for.
    #[must_use]
    pub fn element(&self) -> ElementType {
        self.element
    }

    /// The number of live pools of this element type.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pool_count
    }

    /// The cumulative number of slots allocated by all pools of this element type.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// The number of slots currently in use across all pools of this element type.
    #[must_use]
    pub fn use_count(&self) -> u64 {
        self.use_count
    }
}
