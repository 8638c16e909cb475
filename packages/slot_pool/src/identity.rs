use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the element type of a pool.
///
/// Equality and hashing only consider the [`TypeId`]. The type name is carried along for
/// diagnostics output and is not guaranteed to be unique or stable between compiler versions.
///
/// # Example
///
/// ```
/// use slot_pool::ElementType;
///
/// let element = ElementType::of::<u64>();
///
/// assert_eq!(element, ElementType::of::<u64>());
/// assert_ne!(element, ElementType::of::<u32>());
/// assert_eq!(element.name(), "u64");
/// ```
#[derive(Clone, Copy)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    /// The element type identity of `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The [`TypeId`] of the element type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The name of the element type, as reported by [`std::any::type_name()`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ElementType {}

impl Hash for ElementType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementType").field(&self.name).finish()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identifies one pool instance.
///
/// Every pool created in the process receives a distinct ID, regardless of element type.
/// IDs are never reused, so an ID that outlives its pool cannot be confused with a
/// different pool.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PoolId(u64);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

impl PoolId {
    pub(crate) fn generate() -> Self {
        Self(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric value of the ID.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use foldhash::{HashSet, HashSetExt};
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ElementType: Send, Sync, Copy);
    assert_impl_all!(PoolId: Send, Sync, Copy);

    #[test]
    fn element_type_identity_follows_type_id() {
        let mut seen = HashSet::new();

        assert!(seen.insert(ElementType::of::<u8>()));
        assert!(seen.insert(ElementType::of::<String>()));
        assert!(!seen.insert(ElementType::of::<u8>()));

        assert_eq!(ElementType::of::<String>().id(), TypeId::of::<String>());
    }

    #[test]
    fn element_type_displays_type_name() {
        assert_eq!(ElementType::of::<u16>().to_string(), "u16");
    }

    #[test]
    fn pool_ids_are_unique() {
        let a = PoolId::generate();
        let b = PoolId::generate();

        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }
}
