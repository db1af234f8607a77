//! Abstract memory budget interfaces.
//!
//! The concrete ledger (atomic compare-exchange accounting, peak tracking,
//! enforcement policy) lives in `iostream-mem`. Keeping only traits here lets
//! `iostream-stream` and `iostream-pq` depend on the budget API without
//! pulling in the concrete accountant.

/// RAII handle returned when bytes are acquired from a [`MemoryBudget`].
/// Must release its bytes on `Drop`.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;

    /// Debug tag identifying what acquired the bytes (e.g. `"buffer0"`,
    /// `"em_buffer"`), surfaced in tracing spans and error messages.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A memory-cap enforcer. Buffer0, the replacement-selection heap, and the
/// EM priority queue's buffers all acquire through this before growing, so
/// a single accountant can bound total resident memory across the whole
/// adaptive structure.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `bytes` from the live budget. Returns `None` when
    /// the request would exceed capacity under an enforcing policy; callers
    /// must spill, shrink, or fail in that case.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity in bytes.
    fn capacity_bytes(&self) -> usize;

    /// Approximate currently used bytes (advisory; not a correctness API).
    fn used_bytes(&self) -> usize;

    /// Bytes left before the next `try_acquire` would exceed capacity. Every
    /// sizing decision in the sort engine and the EM priority queue reads
    /// this before allocating, rather than a static config field, so sizing
    /// tracks what is actually still resident.
    fn memory_available(&self) -> usize {
        self.capacity_bytes().saturating_sub(self.used_bytes())
    }
}
