//! Runtime configuration, following the teacher's `EngineConfig` shape: a
//! plain serde struct with a `Default` impl and an `IOSTREAM_*`-prefixed
//! `from_env()` loader.

use serde::{Deserialize, Serialize};

/// Name of the legacy environment variable the original library consulted
/// for the stream temp directory (`#define STREAM_TMPDIR "STREAM_DIR"` in
/// `ami_stream.h`). Looked up verbatim so behavior matches the original when
/// present, falling back to `std::env::temp_dir()` when unset.
pub const STREAM_DIR_ENV: &str = "STREAM_DIR";

/// Prefix used for anonymous stream file names, matching `BASE_NAME` in the
/// original library.
pub const STREAM_NAME_PREFIX: &str = "STREAM_";

/// Default per-stream buffer size: `STREAM_BUFFER_SIZE = (1 << 18)`, 256 KiB.
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 1 << 18;

/// Hard ceiling on concurrently open streams, matching `MAX_STREAMS_OPEN`.
pub const DEFAULT_MAX_STREAMS_OPEN: usize = 200;

/// How the memory accountant reacts when a request would exceed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPolicy {
    /// Accept the request anyway and keep tracking peak usage (useful for
    /// measuring an unconstrained workload's real footprint).
    Ignore,
    /// Reject the request; the caller must spill, shrink, or propagate the
    /// error. The default, matching the original library's fixed buffers.
    Abort,
    /// Accept the request but emit a `tracing::warn!` each time capacity is
    /// exceeded.
    Warn,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        MemoryPolicy::Abort
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hard memory cap in bytes for the accountant shared across Buffer0,
    /// the replacement-selection heap, and the EM priority queue's buffers.
    pub mem_cap_bytes: usize,

    /// What the accountant does when a request would exceed `mem_cap_bytes`.
    pub memory_policy: MemoryPolicy,

    /// Per-stream I/O buffer size, in bytes.
    pub stream_buffer_size: usize,

    /// Ceiling on concurrently open stream file handles.
    pub max_streams_open: usize,

    /// Directory for anonymous stream files; `None` means "consult
    /// `STREAM_DIR_ENV`, falling back to the OS temp directory".
    pub stream_dir: Option<String>,

    /// Optional seed for the quicksort pivot selection and any other
    /// randomized choice, for reproducible test runs.
    pub seed: Option<u64>,

    /// Below this many elements, `sortalg::quicksort` falls back to
    /// insertion sort rather than recursing further.
    pub insertion_sort_cutoff: usize,

    /// When set, the sort engine halves its run-formation heap capacity to
    /// leave more of `mem_cap_bytes` free for concurrent stream buffers,
    /// trading longer runs (and thus more merge passes) for a smaller
    /// resident footprint.
    pub save_memory: bool,

    /// Maximum number of buffer levels the EM priority queue may allocate
    /// before refusing further insertions with
    /// `Error::InsufficientAvailableStreams`.
    pub pq_max_buffer_levels: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mem_cap_bytes: 512 * 1024 * 1024,
            memory_policy: MemoryPolicy::default(),
            stream_buffer_size: DEFAULT_STREAM_BUFFER_SIZE,
            max_streams_open: DEFAULT_MAX_STREAMS_OPEN,
            stream_dir: None,
            seed: None,
            insertion_sort_cutoff: crate::sortalg::INSERTION_THRESHOLD,
            save_memory: false,
            pq_max_buffer_levels: 32,
        }
    }
}

impl Config {
    /// Builds a config from `IOSTREAM_*` environment variables, falling back
    /// to defaults for anything unset or unparseable.
    ///
    /// - `IOSTREAM_MEM_CAP_BYTES`
    /// - `IOSTREAM_MEMORY_POLICY` (`ignore` | `abort` | `warn`)
    /// - `IOSTREAM_STREAM_BUFFER_SIZE`
    /// - `IOSTREAM_MAX_STREAMS_OPEN`
    /// - `IOSTREAM_STREAM_DIR` (falls back to `STREAM_DIR`, then the OS temp dir)
    /// - `IOSTREAM_SEED`
    /// - `IOSTREAM_INSERTION_SORT_CUTOFF`
    /// - `IOSTREAM_SAVE_MEMORY` (`true` | `false`)
    /// - `IOSTREAM_PQ_MAX_BUFFER_LEVELS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = env_parse::<usize>("IOSTREAM_MEM_CAP_BYTES") {
            cfg.mem_cap_bytes = v;
        }
        if let Ok(s) = std::env::var("IOSTREAM_MEMORY_POLICY") {
            cfg.memory_policy = match s.to_ascii_lowercase().as_str() {
                "ignore" => MemoryPolicy::Ignore,
                "warn" => MemoryPolicy::Warn,
                _ => MemoryPolicy::Abort,
            };
        }
        if let Ok(v) = env_parse::<usize>("IOSTREAM_STREAM_BUFFER_SIZE") {
            cfg.stream_buffer_size = v;
        }
        if let Ok(v) = env_parse::<usize>("IOSTREAM_MAX_STREAMS_OPEN") {
            cfg.max_streams_open = v;
        }
        if let Ok(s) = std::env::var("IOSTREAM_STREAM_DIR") {
            cfg.stream_dir = Some(s);
        } else if let Ok(s) = std::env::var(STREAM_DIR_ENV) {
            cfg.stream_dir = Some(s);
        }
        if let Ok(v) = env_parse::<u64>("IOSTREAM_SEED") {
            cfg.seed = Some(v);
        }
        if let Ok(v) = env_parse::<usize>("IOSTREAM_INSERTION_SORT_CUTOFF") {
            cfg.insertion_sort_cutoff = v;
        }
        if let Ok(s) = std::env::var("IOSTREAM_SAVE_MEMORY") {
            cfg.save_memory = s.eq_ignore_ascii_case("true") || s == "1";
        }
        if let Ok(v) = env_parse::<usize>("IOSTREAM_PQ_MAX_BUFFER_LEVELS") {
            cfg.pq_max_buffer_levels = v;
        }

        cfg
    }

    /// Resolves the directory anonymous stream files are created in,
    /// applying the `STREAM_DIR` fallback chain.
    pub fn resolve_stream_dir(&self) -> std::path::PathBuf {
        match &self.stream_dir {
            Some(dir) => std::path::PathBuf::from(dir),
            None => std::env::var(STREAM_DIR_ENV)
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<T, ()> {
    std::env::var(key).map_err(|_| ())?.parse().map_err(|_| ())
}
