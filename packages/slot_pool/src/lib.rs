#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Per-type object pools that hand out uninitialized slots of storage, with a process-wide
//! registry that reports how many slots each element type has allocated and has in use.
//!
//! This crate provides [`SlotPool`], a pool of unbounded size that stores items of one type in
//! blocks of a fixed number of slots, and two accessor layers that manage one pool per element
//! type for you:
//!
//! - [`local`] - one pool per type per thread, with no locking.
//! - [`shared`] - one pool per type per process, each behind its own lock.
//!
//! # Key Features
//!
//! - **Storage, not objects**: pools issue raw [`Slot`]s. Values are placed into slots and
//!   dropped with [`construct()`] and [`destruct()`], so trivially copyable data can reuse slots
//!   without any initialization cost.
//! - **Stable addresses**: blocks are never released while their pool exists.
//! - **LIFO reuse**: the most recently returned slot is the next one issued.
//! - **Handles that cannot be misused**: a [`Slot`] cannot be copied, returning it consumes it
//!   and returning it to a foreign pool panics.
//! - **Raw memory pools**: [`Mem<SIZE>`] pools untyped `SIZE`-byte buffers.
//! - **Diagnostics**: every pool reports to a [`Channel`]; the [`Monitor`] aggregates what it
//!   hears into a per-type table of allocated and in-use slots.
//!
//! # Example
//!
//! ```
//! use slot_pool::{Monitor, construct, destruct, local};
//!
//! #[derive(Debug)]
//! struct Packet {
//!     id: u32,
//!     payload: [u8; 64],
//! }
//!
//! let mut slot = local::get::<Packet>();
//! construct(
//!     &mut slot,
//!     Packet {
//!         id: 7,
//!         payload: [0; 64],
//!     },
//! );
//!
//! assert_eq!(slot.value().id, 7);
//! assert_eq!(slot.value().payload.len(), 64);
//!
//! println!("{}", Monitor::global().stat());
//!
//! destruct(&mut slot);
//! local::ret(slot);
//! ```
//!
//! # Explicit pools
//!
//! Pools can also be created directly, e.g. to pick a block size or to report to a channel of
//! their own instead of the process-wide one:
//!
//! ```
//! use std::num::NonZero;
//!
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<u32>::builder()
//!     .block_size(NonZero::new(1024).unwrap())
//!     .build();
//!
//! let slot = pool.get();
//! assert_eq!(pool.total_count(), 1024);
//!
//! pool.ret(slot);
//! ```

mod block;
mod builder;
mod channel;
mod coordinates;
mod counters;
mod error;
mod identity;
mod lifecycle;
mod mem;
mod monitor;
mod slot;
mod slot_pool;

pub mod local;
pub mod shared;

pub(crate) use block::*;
pub use builder::*;
pub use channel::*;
pub(crate) use coordinates::*;
pub use counters::{PoolRef, PoolStats};
pub(crate) use counters::PoolCounters;
pub use error::Error;
pub use identity::*;
pub use lifecycle::*;
pub use mem::Mem;
pub use monitor::*;
pub use slot::Slot;
pub use slot_pool::SlotPool;
