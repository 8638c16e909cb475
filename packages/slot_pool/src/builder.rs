use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::sync::Arc;

use crate::{Channel, SlotPool};

/// The number of slots in each block of a pool, unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: NonZero<usize> = NonZero::new(128).expect("128 is non-zero");

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`SlotPool::new()`][1] allocates blocks of
/// [`DEFAULT_BLOCK_SIZE`] slots and registers the pool with [`Channel::global()`].
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
/// use std::sync::Arc;
///
/// use slot_pool::{Channel, SlotPool};
///
/// let channel = Arc::new(Channel::new());
///
/// let pool = SlotPool::<u32>::builder()
///     .block_size(NonZero::new(16).unwrap())
///     .channel(&channel)
///     .build();
///
/// assert_eq!(pool.block_size().get(), 16);
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct SlotPoolBuilder<T> {
    block_size: NonZero<usize>,
    channel: Option<Arc<Channel>>,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("block_size", &self.block_size)
            .field("channel", &self.channel)
            .finish()
    }
}

impl<T: 'static> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            channel: None,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots allocated at once whenever the pool needs to grow.
    ///
    /// The block size is fixed for the lifetime of the pool.
    pub fn block_size(mut self, block_size: NonZero<usize>) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the channel the pool announces itself to. Defaults to [`Channel::global()`].
    pub fn channel(mut self, channel: &Arc<Channel>) -> Self {
        self.channel = Some(Arc::clone(channel));
        self
    }

    /// Builds the pool with the specified configuration, announcing it to its channel.
    #[must_use]
    pub fn build(self) -> SlotPool<T> {
        let channel = self
            .channel
            .unwrap_or_else(|| Arc::clone(Channel::global()));

        SlotPool::new_inner(self.block_size, channel)
    }
}
