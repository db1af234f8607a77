//! Fallible byte-buffer allocation on top of the [`Accountant`]. Used by
//! Buffer0 and the EM priority queue's buffer levels so every large
//! allocation flows through the same accounted budget.

use std::ops::{Deref, DerefMut};

use iostream_core::budget::{BudgetGuard, MemoryBudget};

use crate::accountant::AccountantGuard;
use crate::error::{Error, Result};

/// Byte buffer that returns its accounted bytes to the budget on drop.
pub struct OwnedBuf {
    guard: AccountantGuard,
    buf: Vec<u8>,
}

impl OwnedBuf {
    pub fn new_zeroed(
        budget: &impl MemoryBudget<Guard = AccountantGuard>,
        len: usize,
        tag: &'static str,
    ) -> Result<Self> {
        let guard = budget
            .try_acquire(len, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: len,
                capacity: budget.capacity_bytes(),
                used: budget.used_bytes(),
            })?;
        let mut buf = Vec::with_capacity(len);
        buf.resize(len, 0u8);
        Ok(Self { guard, buf })
    }

    pub fn with_capacity(
        budget: &impl MemoryBudget<Guard = AccountantGuard>,
        cap: usize,
        tag: &'static str,
    ) -> Result<Self> {
        let guard = budget
            .try_acquire(cap, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: cap,
                capacity: budget.capacity_bytes(),
                used: budget.used_bytes(),
            })?;
        Ok(Self {
            guard,
            buf: Vec::with_capacity(cap),
        })
    }

    pub fn accounted_bytes(&self) -> usize {
        self.guard.bytes()
    }

    pub fn into_inner(self) -> (Vec<u8>, AccountantGuard) {
        (self.buf, self.guard)
    }

    /// Grows the backing `Vec`'s capacity, acquiring the additional budget
    /// first. Returns `false` without mutating the buffer if the budget
    /// can't accommodate the grow.
    pub fn try_grow(&mut self, new_cap: usize) -> bool {
        if new_cap <= self.buf.capacity() {
            return true;
        }
        if self.guard.try_resize(new_cap) {
            let additional = new_cap - self.buf.capacity();
            self.buf.reserve_exact(additional);
            true
        } else {
            false
        }
    }
}

impl Deref for OwnedBuf {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for OwnedBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accountant::Accountant;
    use iostream_core::config::MemoryPolicy;

    #[test]
    fn zeroed_buffer_has_requested_length() {
        let acc = Accountant::new(1024, MemoryPolicy::Abort);
        let buf = OwnedBuf::new_zeroed(&acc, 128, "test").unwrap();
        assert_eq!(buf.len(), 128);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn over_budget_allocation_fails() {
        let acc = Accountant::new(64, MemoryPolicy::Abort);
        assert!(OwnedBuf::new_zeroed(&acc, 128, "test").is_err());
    }

    #[test]
    fn try_grow_respects_budget() {
        let acc = Accountant::new(128, MemoryPolicy::Abort);
        let mut buf = OwnedBuf::with_capacity(&acc, 64, "test").unwrap();
        assert!(buf.try_grow(128));
        assert!(!buf.try_grow(256));
    }
}
