//! Write-then-rename file replacement.

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replace `path` with `bytes` so readers see either the old or the new file,
/// never a partial write. The temp file lives in the target directory so the
/// final rename stays on one filesystem.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
