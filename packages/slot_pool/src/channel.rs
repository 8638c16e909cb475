use std::fmt;
use std::mem;
use std::sync::{Arc, LazyLock};

use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::debug;

use crate::{ElementType, PoolId, PoolRef};

/// Receives notifications about pools being created and deleted.
///
/// Observers are attached to a [`Channel`] via [`Channel::set()`]. The [`Monitor`][1] is the
/// standard observer, which aggregates statistics about all pools it has been told about.
///
/// # Reentrancy
///
/// Notifications are delivered while the channel lock is held. An observer must not create or
/// drop pools (nor otherwise call into the channel) from within a notification, under threat
/// of deadlock.
///
/// # Duplicates
///
/// Whenever an attached observer receives a notification, the channel also replays every pool
/// registered before the observer was attached, as a burst of `created()` calls. Observers must
/// therefore treat `created()` as idempotent.
///
/// [1]: crate::Monitor
pub trait Observer: Send + Sync {
    /// A pool with elements of type `element` has been created.
    fn created(&self, element: ElementType, pool: &PoolRef);

    /// A pool with elements of type `element` is being dropped.
    fn deleted(&self, element: ElementType, pool: &PoolRef);
}

/// Registry of live pools, with at most one attached [`Observer`].
///
/// Every [`SlotPool`][1] announces itself to a channel when created and when dropped. While no
/// observer is attached, the channel buffers the registrations itself. When an observer is
/// attached, the buffered registrations are replayed to it, so it learns about every pool that
/// already exists.
///
/// The accessor layer ([`local`][2] and [`shared`][3]) uses the process-wide channel returned by
/// [`Channel::global()`]. Pools built directly may use their own channel.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use slot_pool::{Channel, Monitor, SlotPool};
///
/// let channel = Arc::new(Channel::new());
///
/// let pool = SlotPool::<u64>::builder().channel(&channel).build();
///
/// // The monitor is told about the pool that already exists.
/// let monitor = Monitor::attach(&channel);
/// assert_eq!(monitor.stat().get::<u64>().unwrap().pool_count(), 1);
///
/// drop(pool);
/// assert!(monitor.stat().is_empty());
/// ```
///
/// [1]: crate::SlotPool
/// [2]: crate::local
/// [3]: crate::shared
pub struct Channel {
    state: Mutex<ChannelState>,
}

#[derive(Default)]
struct ChannelState {
    /// Pools registered while no observer was attached.
    buffered: HashMap<ElementType, HashMap<PoolId, PoolRef>>,

    observer: Option<Arc<dyn Observer>>,
}

static GLOBAL_CHANNEL: LazyLock<Arc<Channel>> = LazyLock::new(|| Arc::new(Channel::new()));

impl Channel {
    /// Creates a channel with no pools and no observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState::default()),
        }
    }

    /// The process-wide channel, used by pools unless configured otherwise.
    #[must_use]
    pub fn global() -> &'static Arc<Self> {
        &GLOBAL_CHANNEL
    }

    /// Registers a newly created pool.
    ///
    /// With an observer attached, the observer is notified and then receives a replay of all
    /// buffered pools. Otherwise, the pool is buffered until an observer is attached.
    pub fn created(&self, element: ElementType, pool: &PoolRef) {
        let mut state = self.state.lock();

        if let Some(observer) = &state.observer {
            observer.created(element, pool);
            state.replay();
        } else {
            state
                .buffered
                .entry(element)
                .or_insert_with(HashMap::new)
                .insert(pool.id(), pool.clone());
        }
    }

    /// Unregisters a pool that is being dropped.
    ///
    /// With an observer attached, the observer is notified and then receives a replay of all
    /// buffered pools. In all cases, the pool is removed from the buffer so it is never replayed
    /// after this point.
    pub fn deleted(&self, element: ElementType, pool: &PoolRef) {
        let mut state = self.state.lock();

        state.forget(element, pool.id());

        if let Some(observer) = &state.observer {
            observer.deleted(element, pool);
            state.replay();
        }
    }

    /// Attaches an observer (replacing any previous one) or detaches the current one.
    ///
    /// A newly attached observer immediately receives a `created()` notification for every
    /// buffered pool. Returns the previously attached observer, if any.
    pub fn set(&self, observer: Option<Arc<dyn Observer>>) -> Option<Arc<dyn Observer>> {
        let mut state = self.state.lock();

        debug!(
            attached = observer.is_some(),
            buffered_pools = state.buffered_pool_count(),
            "setting pool observer"
        );

        let previous = mem::replace(&mut state.observer, observer);
        state.replay();

        previous
    }

    /// Whether an observer is currently attached.
    #[must_use]
    pub fn has_observer(&self) -> bool {
        self.state.lock().observer.is_some()
    }

    /// The number of pool registrations currently held in the buffer.
    #[must_use]
    pub fn buffered_pool_count(&self) -> usize {
        self.state.lock().buffered_pool_count()
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct("Channel")
            .field("buffered_types", &state.buffered.len())
            .field("buffered_pools", &state.buffered_pool_count())
            .field("has_observer", &state.observer.is_some())
            .finish()
    }
}

impl ChannelState {
    fn replay(&self) {
        let Some(observer) = &self.observer else {
            return;
        };

        for (element, pools) in &self.buffered {
            for pool in pools.values() {
                observer.created(*element, pool);
            }
        }
    }

    fn forget(&mut self, element: ElementType, id: PoolId) {
        let Some(pools) = self.buffered.get_mut(&element) else {
            return;
        };

        pools.remove(&id);

        if pools.is_empty() {
            self.buffered.remove(&element);
        }
    }

    fn buffered_pool_count(&self) -> usize {
        self.buffered.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{PoolCounters, PoolStats};

    assert_impl_all!(Channel: Send, Sync);

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum Notification {
        Created(ElementType, PoolId),
        Deleted(ElementType, PoolId),
    }

    #[derive(Default)]
    struct RecordingObserver {
        notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingObserver {
        fn take(&self) -> Vec<Notification> {
            mem::take(&mut *self.notifications.lock())
        }
    }

    impl Observer for RecordingObserver {
        fn created(&self, element: ElementType, pool: &PoolRef) {
            self.notifications
                .lock()
                .push(Notification::Created(element, pool.id()));
        }

        fn deleted(&self, element: ElementType, pool: &PoolRef) {
            self.notifications
                .lock()
                .push(Notification::Deleted(element, pool.id()));
        }
    }

    fn fake_pool() -> PoolRef {
        PoolRef::new(
            PoolId::generate(),
            Arc::new(PoolCounters::default()) as Arc<dyn PoolStats>,
        )
    }

    fn attach(channel: &Channel) -> Arc<RecordingObserver> {
        let observer = Arc::new(RecordingObserver::default());
        _ = channel.set(Some(Arc::clone(&observer) as Arc<dyn Observer>));
        observer
    }

    #[test]
    fn buffers_without_observer() {
        let channel = Channel::new();
        let u32_type = ElementType::of::<u32>();

        let a = fake_pool();
        let b = fake_pool();

        channel.created(u32_type, &a);
        channel.created(u32_type, &b);
        assert_eq!(channel.buffered_pool_count(), 2);

        channel.deleted(u32_type, &a);
        assert_eq!(channel.buffered_pool_count(), 1);

        channel.deleted(u32_type, &b);
        assert_eq!(channel.buffered_pool_count(), 0);
        assert!(!channel.has_observer());
    }

    #[test]
    fn attach_replays_each_live_pool_once() {
        let channel = Channel::new();
        let u32_type = ElementType::of::<u32>();
        let string_type = ElementType::of::<String>();

        let a = fake_pool();
        let b = fake_pool();
        let gone = fake_pool();

        channel.created(u32_type, &a);
        channel.created(string_type, &b);
        channel.created(u32_type, &gone);
        channel.deleted(u32_type, &gone);

        let observer = attach(&channel);
        let mut received = observer.take();
        received.sort_by_key(|n| match n {
            Notification::Created(_, id) | Notification::Deleted(_, id) => *id,
        });

        assert_eq!(
            received,
            vec![
                Notification::Created(u32_type, a.id()),
                Notification::Created(string_type, b.id()),
            ]
        );
    }

    #[test]
    fn created_after_attach_forwards_then_replays_buffer() {
        let channel = Channel::new();
        let u32_type = ElementType::of::<u32>();
        let u64_type = ElementType::of::<u64>();

        let early = fake_pool();
        channel.created(u32_type, &early);

        let observer = attach(&channel);
        _ = observer.take();

        let late = fake_pool();
        channel.created(u64_type, &late);

        assert_eq!(
            observer.take(),
            vec![
                Notification::Created(u64_type, late.id()),
                Notification::Created(u32_type, early.id()),
            ]
        );

        // Pools created while an observer is attached are not buffered.
        assert_eq!(channel.buffered_pool_count(), 1);
    }

    #[test]
    fn deleted_after_attach_forwards_and_purges_buffer() {
        let channel = Channel::new();
        let u32_type = ElementType::of::<u32>();

        let early = fake_pool();
        let other = fake_pool();
        channel.created(u32_type, &early);
        channel.created(u32_type, &other);

        let observer = attach(&channel);
        _ = observer.take();

        channel.deleted(u32_type, &early);

        assert_eq!(
            observer.take(),
            vec![
                Notification::Deleted(u32_type, early.id()),
                Notification::Created(u32_type, other.id()),
            ]
        );
        assert_eq!(channel.buffered_pool_count(), 1);
    }

    #[test]
    fn set_returns_previous_and_detaches() {
        let channel = Channel::new();

        let first = attach(&channel);
        assert!(channel.has_observer());

        let previous = channel.set(None).expect("an observer was attached");
        assert!(Arc::ptr_eq(
            &previous,
            &(Arc::clone(&first) as Arc<dyn Observer>)
        ));
        assert!(!channel.has_observer());

        // Detached observers hear nothing more; the channel buffers again.
        channel.created(ElementType::of::<u8>(), &fake_pool());
        assert!(first.take().is_empty());
        assert_eq!(channel.buffered_pool_count(), 1);
    }

    #[test]
    fn replacing_observer_replays_to_new_one() {
        let channel = Channel::new();
        let u8_type = ElementType::of::<u8>();

        let pool = fake_pool();
        channel.created(u8_type, &pool);

        let first = attach(&channel);
        let second = attach(&channel);

        assert_eq!(first.take(), vec![Notification::Created(u8_type, pool.id())]);
        assert_eq!(second.take(), vec![Notification::Created(u8_type, pool.id())]);
    }
}
