use std::fmt;

/// A plain buffer of `SIZE` bytes, for pooling raw memory instead of typed objects.
///
/// Use this as the element type of a pool when you want generic memory blocks of a given size.
/// The type has alignment 1 and no behavior beyond holding its bytes.
///
/// A zero-sized buffer is rejected at compile time.
///
/// # Example
///
/// ```
/// use slot_pool::{Mem, construct, local};
///
/// let mut slot = local::get_mem::<64>();
/// let buffer = construct(&mut slot, Mem::zeroed());
///
/// buffer.as_bytes_mut()[..5].copy_from_slice(b"hello");
/// assert_eq!(&slot.value().as_bytes()[..5], b"hello");
///
/// local::ret(slot);
/// ```
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Mem<const SIZE: usize> {
    bytes: [u8; SIZE],
}

impl<const SIZE: usize> Mem<SIZE> {
    /// Evaluating this fails compilation if `SIZE` is zero.
    pub(crate) const ASSERT_NON_EMPTY: () = assert!(SIZE > 0, "Mem<SIZE> requires SIZE > 0");

    /// The number of bytes in the buffer.
    pub const LEN: usize = {
        let () = Self::ASSERT_NON_EMPTY;
        SIZE
    };

    /// A buffer with every byte set to zero.
    #[must_use]
    pub const fn zeroed() -> Self {
        let () = Self::ASSERT_NON_EMPTY;

        Self { bytes: [0; SIZE] }
    }

    /// The contents of the buffer.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIZE] {
        &self.bytes
    }

    /// The contents of the buffer, for writing.
    #[must_use]
    pub const fn as_bytes_mut(&mut self) -> &mut [u8; SIZE] {
        &mut self.bytes
    }
}

impl<const SIZE: usize> Default for Mem<SIZE> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const SIZE: usize> fmt::Debug for Mem<SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mem").field("len", &SIZE).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::mem::align_of;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Mem<1024>: Send, Sync, Copy);

    #[test]
    fn has_exact_size_and_byte_alignment() {
        assert_eq!(size_of::<Mem<1>>(), 1);
        assert_eq!(size_of::<Mem<1024>>(), 1024);
        assert_eq!(align_of::<Mem<1024>>(), 1);
        assert_eq!(Mem::<37>::LEN, 37);
    }

    #[test]
    fn zeroed_is_all_zero() {
        let mem = Mem::<16>::zeroed();

        assert!(mem.as_bytes().iter().all(|b| *b == 0));
        assert_eq!(Mem::<16>::default().as_bytes(), mem.as_bytes());
    }

    #[test]
    fn bytes_are_writable() {
        let mut mem = Mem::<4>::zeroed();
        mem.as_bytes_mut().copy_from_slice(&[1, 2, 3, 4]);

        assert_eq!(mem.as_bytes(), &[1, 2, 3, 4]);
    }
}
