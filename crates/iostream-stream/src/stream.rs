//! Typed external-memory byte stream, ported from `AMI_STREAM<T>` in
//! `ami_stream.h`. Records are transmuted to/from raw bytes via
//! `bytemuck::Pod`, so there is no header, magic, or trailer on disk: native
//! endianness and native struct layout, exactly like the original's
//! `fread`/`fwrite` of `sizeof(T)`.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};

use iostream_core::config::Config;
use iostream_core::error::{Error, Result};

use crate::naming::anonymous_path;
use crate::persistence::{AccessMode, Persistence};

/// Buffered or direct file handle, chosen per access mode. `ReadWrite` and
/// `AppendWrite` use a plain unbuffered `File` since `std::io` has no
/// combined buffered reader/writer; everything else gets the matching
/// single-direction buffer.
enum Backend {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    Direct(File),
}

impl Backend {
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            Backend::Reader(r) => r.read_exact(buf),
            Backend::Direct(f) => f.read_exact(buf),
            Backend::Writer(_) => unreachable!("write-only backend never reads"),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Backend::Reader(r) => r.read(buf),
            Backend::Direct(f) => f.read(buf),
            Backend::Writer(_) => unreachable!("write-only backend never reads"),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Backend::Writer(w) => w.write_all(buf),
            Backend::Direct(f) => f.write_all(buf),
            Backend::Reader(_) => unreachable!("read-only backend never writes"),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Backend::Writer(w) => w.flush(),
            Backend::Direct(f) => f.flush(),
            Backend::Reader(_) => Ok(()),
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            Backend::Reader(r) => r.seek(pos),
            Backend::Writer(w) => w.seek(pos),
            Backend::Direct(f) => f.seek(pos),
        }
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        self.seek(SeekFrom::Current(0))
    }
}

/// A typed external-memory stream over fixed-size `Pod` records. May be a
/// whole backing file or a read-only logical window (a substream) over a
/// parent stream's file.
pub struct Stream<T: Pod + Zeroable> {
    backend: Backend,
    path: PathBuf,
    access_mode: AccessMode,
    persistence: Persistence,
    /// 0 for a top-level stream, positive for a substream.
    substream_level: u32,
    /// In `T` units; `None` when this is not a substream.
    logical_bos: Option<u64>,
    logical_eos: Option<u64>,
    eof_reached: bool,
    _marker: PhantomData<T>,
}

fn io_err(path: &Path, e: std::io::Error) -> Error {
    Error::io(path.display().to_string(), e)
}

impl<T: Pod + Zeroable> Stream<T> {
    /// Opens a fresh anonymous read-write stream, deleted on drop. This is
    /// the common case: most streams in a sort or priority-queue pipeline
    /// never need a stable name.
    pub fn new_anonymous(cfg: &Config) -> Result<Self> {
        let path = anonymous_path(cfg);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        tracing::debug!(path = %path.display(), "opened anonymous stream");

        Ok(Self {
            backend: Backend::Direct(file),
            path,
            access_mode: AccessMode::ReadWrite,
            persistence: Persistence::Delete,
            substream_level: 0,
            logical_bos: None,
            logical_eos: None,
            eof_reached: false,
            _marker: PhantomData,
        })
    }

    /// Opens a stream at a specific path. A `Read`-mode stream defaults to
    /// `Persistence::Persistent` (we did not create it, so we should not
    /// destroy it); every other mode defaults to `Persistence::Delete`.
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let backend = match mode {
            AccessMode::Read => {
                let file = File::open(&path).map_err(|e| io_err(&path, e))?;
                Backend::Reader(BufReader::new(file))
            }
            AccessMode::Write => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&path)
                    .map_err(|e| io_err(&path, e))?;
                Backend::Writer(BufWriter::new(file))
            }
            AccessMode::Append | AccessMode::AppendWrite => {
                let file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&path)
                    .map_err(|e| io_err(&path, e))?;
                Backend::Writer(BufWriter::new(file))
            }
            AccessMode::ReadWrite => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&path)
                    .map_err(|e| io_err(&path, e))?;
                Backend::Direct(file)
            }
        };

        let persistence = if mode == AccessMode::Read {
            Persistence::Persistent
        } else {
            Persistence::Delete
        };

        Ok(Self {
            backend,
            path,
            access_mode: mode,
            persistence,
            substream_level: 0,
            logical_bos: None,
            logical_eos: None,
            eof_reached: false,
            _marker: PhantomData,
        })
    }

    /// Creates a read-only substream covering the logical window
    /// `[sub_begin, sub_end]` (inclusive), in `T` units, relative to this
    /// stream's own logical window if it is itself a substream. Nested
    /// substreams inherit persistence from their parent and, like the
    /// original, never delete the backing file on drop.
    pub fn new_substream(&self, sub_begin: u64, sub_end: u64) -> Result<Stream<T>> {
        if self.substream_level > 0 {
            let own_len = self.logical_eos.unwrap() - self.logical_bos.unwrap();
            if sub_begin >= own_len || sub_end >= own_len {
                return Err(Error::OutOfRange(format!(
                    "substream range [{sub_begin}, {sub_end}] exceeds parent window of length {own_len}"
                )));
            }
        } else {
            let len = self.stream_len()?;
            if sub_begin > len || sub_end > len {
                return Err(Error::OutOfRange(format!(
                    "substream range [{sub_begin}, {sub_end}] exceeds stream length {len}"
                )));
            }
        }

        let file = File::open(&self.path).map_err(|e| io_err(&self.path, e))?;
        let mut sub = Stream {
            backend: Backend::Reader(BufReader::new(file)),
            path: self.path.clone(),
            access_mode: AccessMode::Read,
            persistence: self.persistence,
            substream_level: self.substream_level + 1,
            logical_bos: None,
            logical_eos: None,
            eof_reached: false,
            _marker: PhantomData,
        };

        if self.substream_level > 0 {
            let bos = self.logical_bos.unwrap();
            sub.logical_bos = Some(bos + sub_begin);
            sub.logical_eos = Some(bos + sub_end + 1);
        } else {
            sub.logical_bos = Some(sub_begin);
            sub.logical_eos = Some(sub_end + 1);
        }

        sub.seek(0)?;
        Ok(sub)
    }

    /// Number of `T`-sized records in the backing file (not clipped to this
    /// stream's logical window, matching the original's `stream_len`).
    pub fn stream_len(&self) -> Result<u64> {
        let meta = std::fs::metadata(&self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(meta.len() / std::mem::size_of::<T>() as u64)
    }

    /// Moves to item `offset` within this stream's logical window.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let abs_offset = match self.logical_bos {
            Some(bos) => {
                let window_len = self.logical_eos.unwrap() - bos;
                if offset > window_len {
                    return Err(Error::OutOfRange(format!(
                        "seek offset {offset} exceeds substream window length {window_len}"
                    )));
                }
                (bos + offset) * std::mem::size_of::<T>() as u64
            }
            None => offset * std::mem::size_of::<T>() as u64,
        };
        self.backend
            .seek(SeekFrom::Start(abs_offset))
            .map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Current position, in item units relative to this stream's logical
    /// window. Lets a caller rewind by a known number of items (e.g. to
    /// "un-read" the last item pulled from a k-way merge heap).
    pub fn current_offset(&mut self) -> Result<u64> {
        let pos = self
            .backend
            .stream_position()
            .map_err(|e| io_err(&self.path, e))?;
        let item_pos = pos / std::mem::size_of::<T>() as u64;
        Ok(match self.logical_bos {
            Some(bos) => item_pos - bos,
            None => item_pos,
        })
    }

    pub fn persist(&mut self, p: Persistence) {
        self.persistence = p;
    }

    pub fn persistence(&self) -> Persistence {
        self.persistence
    }

    pub fn eof(&self) -> bool {
        self.eof_reached
    }

    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    pub fn substream_level(&self) -> u32 {
        self.substream_level
    }

    fn past_logical_eos(&mut self) -> Result<bool> {
        match self.logical_eos {
            Some(eos) => {
                let pos = self
                    .backend
                    .stream_position()
                    .map_err(|e| io_err(&self.path, e))?;
                Ok(pos >= eos * std::mem::size_of::<T>() as u64)
            }
            None => Ok(false),
        }
    }

    /// Reads one item, advancing the stream position. Returns
    /// `Error::EndOfStream` once the substream window (or physical EOF) is
    /// reached.
    pub fn read_item(&mut self) -> Result<T> {
        if self.past_logical_eos()? {
            return Err(Error::EndOfStream);
        }
        let mut item = T::zeroed();
        let buf = bytemuck::bytes_of_mut(&mut item);
        match self.backend.read_exact(buf) {
            Ok(()) => Ok(item),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.eof_reached = true;
                Err(Error::EndOfStream)
            }
            Err(e) => Err(io_err(&self.path, e)),
        }
    }

    /// Writes one item at the current position.
    pub fn write_item(&mut self, item: &T) -> Result<()> {
        if self.past_logical_eos()? {
            return Err(Error::EndOfStream);
        }
        if !self.access_mode.is_writable() {
            return Err(Error::ReadOnly);
        }
        self.backend
            .write_all(bytemuck::bytes_of(item))
            .map_err(|e| io_err(&self.path, e))
    }

    /// Reads up to `data.len()` items into `data`, returning the number
    /// actually read. A short read (including zero) means the logical
    /// window or the physical end of file was reached; `eof()` will report
    /// `true` afterward.
    pub fn read_array(&mut self, data: &mut [T]) -> Result<usize> {
        if self.past_logical_eos()? {
            self.eof_reached = true;
            return Ok(0);
        }
        let buf = bytemuck::cast_slice_mut(data);
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.backend.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.eof_reached = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(&self.path, e)),
            }
        }
        Ok(filled / std::mem::size_of::<T>())
    }

    /// Writes `data` at the current position.
    pub fn write_array(&mut self, data: &[T]) -> Result<()> {
        if self.past_logical_eos()? {
            return Err(Error::EndOfStream);
        }
        if !self.access_mode.is_writable() {
            return Err(Error::ReadOnly);
        }
        self.backend
            .write_all(bytemuck::cast_slice(data))
            .map_err(|e| io_err(&self.path, e))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush().map_err(|e| io_err(&self.path, e))
    }
}

impl<T: Pod + Zeroable> Drop for Stream<T> {
    fn drop(&mut self) {
        let _ = self.backend.flush();
        // Substreams never delete the backing file; only the owning
        // top-level stream may, and only when its policy calls for it.
        if self.substream_level == 0 && self.persistence.deletes_on_drop() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove stream file on drop");
            }
        }
    }
}
