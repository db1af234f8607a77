//! Concrete memory budget: an atomic compare-exchange ledger guarded by an
//! enforcement policy (ignore / abort / warn), extending the teacher's
//! hard-reject-only `MemoryBudgetImpl` with the three-mode knob the
//! accountant's component design calls for.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use iostream_core::budget::{BudgetGuard, MemoryBudget};
use iostream_core::config::MemoryPolicy;

use crate::tracking::PeakTracker;

struct Ledger {
    capacity: usize,
    used: AtomicUsize,
    policy: MemoryPolicy,
    peak: PeakTracker,
}

impl Ledger {
    /// Attempts to move `used` from `cur` to `cur + bytes`. Under `Abort`
    /// this fails once the result would exceed `capacity`; under `Ignore`
    /// and `Warn` it always succeeds, the latter emitting a warning the
    /// first time capacity is crossed.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> bool {
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(bytes);
            let over_capacity = next > self.capacity;

            if over_capacity && self.policy == MemoryPolicy::Abort {
                return false;
            }

            match self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    self.peak.record_used(next);
                    if over_capacity && self.policy == MemoryPolicy::Warn {
                        tracing::warn!(
                            tag,
                            requested = bytes,
                            used = next,
                            capacity = self.capacity,
                            "memory budget exceeded, continuing under Warn policy"
                        );
                    }
                    return true;
                }
                Err(_) => continue,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Concrete [`MemoryBudget`] shared across Buffer0, the replacement-selection
/// heap, and the EM priority queue's buffer levels.
#[derive(Clone)]
pub struct Accountant {
    inner: Arc<Ledger>,
}

impl Accountant {
    pub fn new(capacity_bytes: usize, policy: MemoryPolicy) -> Self {
        Self {
            inner: Arc::new(Ledger {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
                policy,
                peak: PeakTracker::new(),
            }),
        }
    }

    pub fn peak_bytes(&self) -> usize {
        self.inner.peak.peak()
    }

    pub fn policy(&self) -> MemoryPolicy {
        self.inner.policy
    }
}

pub struct AccountantGuard {
    inner: Arc<Ledger>,
    bytes: usize,
    tag: &'static str,
}

impl Drop for AccountantGuard {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.inner.release(self.bytes);
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for AccountantGuard {
    fn bytes(&self) -> usize {
        self.bytes
    }

    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl AccountantGuard {
    /// Resizes this guard's accounted bytes. Shrinking always succeeds;
    /// growing is subject to the same policy as `try_acquire`.
    pub fn try_resize(&mut self, new_bytes: usize) -> bool {
        if new_bytes == self.bytes {
            return true;
        }
        if new_bytes < self.bytes {
            self.inner.release(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return true;
        }
        let delta = new_bytes - self.bytes;
        if self.inner.try_acquire(delta, self.tag) {
            self.bytes = new_bytes;
            true
        } else {
            false
        }
    }
}

impl MemoryBudget for Accountant {
    type Guard = AccountantGuard;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes == 0 {
            return Some(AccountantGuard {
                inner: Arc::clone(&self.inner),
                bytes: 0,
                tag,
            });
        }
        if self.inner.try_acquire(bytes, tag) {
            Some(AccountantGuard {
                inner: Arc::clone(&self.inner),
                bytes,
                tag,
            })
        } else {
            None
        }
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_rejects_over_capacity() {
        let acc = Accountant::new(100, MemoryPolicy::Abort);
        let _g1 = acc.try_acquire(60, "a").expect("fits");
        assert!(acc.try_acquire(60, "b").is_none());
    }

    #[test]
    fn ignore_allows_over_capacity() {
        let acc = Accountant::new(100, MemoryPolicy::Ignore);
        let _g1 = acc.try_acquire(60, "a").expect("fits");
        let g2 = acc.try_acquire(60, "b");
        assert!(g2.is_some());
        assert!(acc.used_bytes() > acc.capacity_bytes());
    }

    #[test]
    fn warn_allows_over_capacity_and_tracks_peak() {
        let acc = Accountant::new(100, MemoryPolicy::Warn);
        let _g1 = acc.try_acquire(60, "a").expect("fits");
        let g2 = acc.try_acquire(60, "b");
        assert!(g2.is_some());
        assert_eq!(acc.peak_bytes(), 120);
    }

    #[test]
    fn drop_releases_bytes() {
        let acc = Accountant::new(100, MemoryPolicy::Abort);
        {
            let _g = acc.try_acquire(100, "a").unwrap();
            assert_eq!(acc.used_bytes(), 100);
        }
        assert_eq!(acc.used_bytes(), 0);
    }

    #[test]
    fn resize_grow_and_shrink() {
        let acc = Accountant::new(100, MemoryPolicy::Abort);
        let mut g = acc.try_acquire(10, "a").unwrap();
        assert!(g.try_resize(50));
        assert_eq!(acc.used_bytes(), 50);
        assert!(g.try_resize(5));
        assert_eq!(acc.used_bytes(), 5);
        assert!(!g.try_resize(1000));
    }
}
