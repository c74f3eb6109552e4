//! Rendered-page cache.
//!
//! Pages are cached by request path. Every rebuild clears the whole cache,
//! since any content change can affect any page.

use folio_store::write_atomic;
use std::io;
use std::path::{Path, PathBuf};

pub trait PageCache: Send + Sync {
    fn get(&self, path: &str) -> Option<String>;
    fn put(&self, path: &str, html: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// One HTML file per page under a cache directory, named by the blake3 hash
/// of the normalized request path.
#[derive(Debug, Clone)]
pub struct FilePageCache {
    dir: PathBuf,
}

impl FilePageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, path: &str) -> PathBuf {
        let key = blake3::hash(folio_types::normalize_path(path).as_bytes());
        self.dir.join(format!("{}.html", key.to_hex()))
    }
}

impl PageCache for FilePageCache {
    fn get(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.entry_path(path)).ok()
    }

    fn put(&self, path: &str, html: &str) -> io::Result<()> {
        write_atomic(&self.entry_path(path), html.as_bytes()).map_err(io::Error::other)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                tracing::debug!("Cleared page cache {:?}", self.dir);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
