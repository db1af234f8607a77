//! Shared foundations for iostream: the error taxonomy, memory-budget
//! traits, configuration, ordering/priority seams, and the allocation-free
//! sort primitives used by both the in-memory staging buffer and the
//! external sort engine.
//!
//! Kept dependency-free of I/O so `iostream-stream` and `iostream-sort` can
//! both depend on it without creating a cycle between them.

pub mod budget;
pub mod comparator;
pub mod config;
pub mod error;
pub mod sortalg;

pub use comparator::{Combine, Comparator, KeyComparator, NaturalOrder, Priority};
pub use config::Config;
pub use error::{Error, Result};
