//! Ordering and merge-combination seams used by the sort engine and the
//! priority queue. Kept separate from `std::cmp::Ord` so callers can plug in
//! a key extraction strategy without wrapping their record type.

/// A strict weak ordering over `T`, supplied explicitly rather than relying
/// on `Ord` so the same record type can be sorted or merged by different
/// keys in different contexts.
pub trait Comparator<T> {
    fn compare(&self, a: &T, b: &T) -> std::cmp::Ordering;

    fn lt(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == std::cmp::Ordering::Less
    }

    fn le(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) != std::cmp::Ordering::Greater
    }

    fn gt(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == std::cmp::Ordering::Greater
    }
}

/// Comparator built from the record's natural `Ord` impl.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    fn compare(&self, a: &T, b: &T) -> std::cmp::Ordering {
        a.cmp(b)
    }
}

/// Comparator built from a key-extraction closure, for sorting/merging
/// records by a derived field without a newtype wrapper.
#[derive(Clone, Copy)]
pub struct KeyComparator<F> {
    key_fn: F,
}

impl<F> KeyComparator<F> {
    pub fn new(key_fn: F) -> Self {
        KeyComparator { key_fn }
    }
}

impl<T, K, F> Comparator<T> for KeyComparator<F>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    fn compare(&self, a: &T, b: &T) -> std::cmp::Ordering {
        (self.key_fn)(a).cmp(&(self.key_fn)(b))
    }
}

/// Priority used by the external-memory priority queue to order elements
/// independently of any payload-combination rule.
pub trait Priority<P: Ord> {
    fn priority(&self) -> P;
}

/// Lets the priority queue coalesce elements that share a priority, mirroring
/// the original `em_pqueue::extract_all_min` accumulation loop. Implementing
/// this is optional: callers who never call `extract_all_min` never need it.
pub trait Combine: Sized {
    fn combine(self, other: Self) -> Self;
}
