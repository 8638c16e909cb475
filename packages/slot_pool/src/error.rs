use std::num::NonZero;

use thiserror::Error;

/// Errors that can occur when working with the pool accessors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A warm-up was requested for a pool that already exists, so the requested block size
    /// had no effect.
    #[error(
        "pool of {type_name} already exists - warm-up with block size {requested_block_size} had no effect"
    )]
    AlreadyCreated {
        /// The element type of the pool.
        type_name: &'static str,

        /// The block size that the caller asked for.
        requested_block_size: NonZero<usize>,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
