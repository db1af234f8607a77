//! The in-memory min-max heap and the external-memory priority queue built
//! on top of it, including the adaptive wrapper that starts purely
//! in-memory and promotes to disk-backed buffer levels on overflow.

pub mod adaptive;
pub mod embuffer;
pub mod empq;
pub mod minmax;

pub use adaptive::AdaptivePQueue;
pub use embuffer::EmBuffer;
pub use empq::ExternalPQueue;
pub use minmax::MinMaxHeap;
