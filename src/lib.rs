//! External-memory typed streams, merge sort, and priority queue.
//!
//! Re-exports the public surface of the workspace's library crates so a
//! consumer can depend on a single `iostream` crate instead of wiring up
//! each piece by hand.

pub use iostream_core::{comparator, config, error};
pub use iostream_mem as mem;
pub use iostream_pq as pq;
pub use iostream_sort as sort;
pub use iostream_stream as stream;
