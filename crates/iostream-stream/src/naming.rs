//! Anonymous stream file naming. Ported from `ami_single_temp_name`, which
//! built a collision-resistant random name under `STREAM_TMPDIR`; a UUID v4
//! suffix gives the same guarantee without a retry loop.

use std::path::PathBuf;

use iostream_core::config::{Config, STREAM_NAME_PREFIX};

/// Builds a fresh path for an anonymous stream's backing file, under the
/// configured stream directory.
pub fn anonymous_path(cfg: &Config) -> PathBuf {
    let dir = cfg.resolve_stream_dir();
    let name = format!("{STREAM_NAME_PREFIX}{}", uuid::Uuid::new_v4());
    dir.join(name)
}
