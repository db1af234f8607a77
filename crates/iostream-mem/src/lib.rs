#![forbid(unsafe_code)]
//! Concrete implementation of the `iostream_core::budget` interfaces: an
//! atomic-ledger accountant with an enforcement policy (ignore/abort/warn),
//! peak tracking, and a fallible byte-buffer pool built on top of it.
//!
//! All large allocations in Buffer0, the replacement-selection heap, and the
//! EM priority queue's buffer levels flow through this crate so a single
//! accountant can bound the whole adaptive structure's resident memory.

pub mod accountant;
pub mod error;
pub mod pool;
pub mod tracking;

pub use accountant::{Accountant, AccountantGuard};
pub use pool::OwnedBuf;
