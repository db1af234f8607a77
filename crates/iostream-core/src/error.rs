//! Error taxonomy shared by every iostream crate.
//!
//! `EndOfStream` is the only variant read loops are expected to recover
//! from (see iostream's error handling design); everything else propagates
//! to the caller via `?` and is treated as fatal.

use thiserror::Error;

/// Canonical result type for iostream.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("end of stream")]
    EndOfStream,

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("stream is read-only")]
    ReadOnly,

    #[error("OS error: {0}")]
    Os(String),

    #[error("memory manager error: {0}")]
    Mm(String),

    #[error("object initialization failed: {0}")]
    ObjectInitialization(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("insufficient main memory: {0}")]
    InsufficientMainMemory(String),

    #[error("insufficient available streams (max {max_streams_open}): {0}", max_streams_open = .1)]
    InsufficientAvailableStreams(String, usize),

    #[error("required environment variable {0} is undefined")]
    EnvUndefined(String),

    #[error("operation not valid without main memory: {0}")]
    NoMainMemoryOperation(String),
}

impl Error {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the single recoverable error kind (end of stream).
    pub fn is_eos(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}
