//! Typed external-memory byte streams: the `Stream<T>` abstraction over a
//! file of fixed-size `Pod` records (with read-only logical substreams), and
//! `Buffer0`, the bounded in-memory staging buffer shared by the sort engine
//! and the EM priority queue.

pub mod buffer0;
pub mod naming;
pub mod persistence;
pub mod stream;

pub use buffer0::Buffer0;
pub use persistence::{AccessMode, Persistence};
pub use stream::Stream;
