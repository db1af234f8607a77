//! Persistence policy controlling what happens to a stream's backing file
//! when the stream is dropped. Ported from the `persistence` enum in
//! `ami_stream.h`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Delete the backing file when the stream (not a substream) is dropped.
    Delete,
    /// Never delete the backing file.
    Persistent,
    /// Delete the backing file when the stream is dropped, same as
    /// `Delete`. The original per-block eager deletion as a stream is read
    /// would require sparse-file hole punching; this port deletes the whole
    /// file at drop time instead, which is observably equivalent for any
    /// stream that is read to completion exactly once.
    ReadOnce,
}

impl Persistence {
    pub fn deletes_on_drop(self) -> bool {
        !matches!(self, Persistence::Persistent)
    }
}

/// The access mode a stream (or its backing file) is opened with, mirroring
/// `AMI_stream_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Open an existing stream for reading only.
    Read,
    /// Open for writing, creating (and truncating) if needed.
    Write,
    /// Open for writing at the end, creating if needed.
    Append,
    /// Open for both reading and writing.
    ReadWrite,
    /// Open for writing at the end, write-only.
    AppendWrite,
}

impl AccessMode {
    pub fn is_readable(self) -> bool {
        matches!(
            self,
            AccessMode::Read | AccessMode::ReadWrite
        )
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, AccessMode::Read)
    }
}
