//! Backend construction and selection.

use crate::config::Config;
use folio_store::{ArrayBackend, Backend, BackendKind, SnapshotCodec};
use std::sync::Arc;

/// Is `kind` usable in this build?
pub fn is_available(kind: BackendKind) -> bool {
    match kind {
        BackendKind::Array => true,
        BackendKind::Sqlite => cfg!(feature = "sqlite"),
    }
}

pub fn codec(config: &Config) -> SnapshotCodec {
    SnapshotCodec::new(config.site.serializer, config.site.signing_key.as_deref())
}

/// The backend a rebuild writes through: the configured one when this build
/// has it, the array backend otherwise.
pub fn write_kind(config: &Config) -> BackendKind {
    let kind = config.site.backend;
    if is_available(kind) {
        kind
    } else {
        tracing::warn!(
            "Backend '{}' is not available in this build, using array",
            kind.as_str()
        );
        BackendKind::Array
    }
}

/// The backend reads go through. A requested SQLite backend whose database
/// file does not exist yet falls back to the array backend.
pub fn read_kind(config: &Config, requested: BackendKind) -> BackendKind {
    match requested {
        BackendKind::Sqlite if !is_available(BackendKind::Sqlite) => {
            tracing::debug!("SQLite backend not compiled in, falling back to array");
            BackendKind::Array
        }
        BackendKind::Sqlite if !config.sqlite_path().exists() => {
            tracing::debug!(
                "SQLite index {:?} missing, falling back to array",
                config.sqlite_path()
            );
            BackendKind::Array
        }
        other => other,
    }
}

/// Construct a backend of `kind` for the site.
pub fn open(config: &Config, kind: BackendKind) -> Arc<dyn Backend> {
    let limit = config.site.recent_cache_size;
    match kind {
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => Arc::new(
            folio_store::SqliteBackend::new(config.sqlite_path()).with_recent_limit(limit),
        ),
        _ => Arc::new(ArrayBackend::new(config.index_dir(), codec(config)).with_recent_limit(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    fn config(root: &std::path::Path, backend: BackendKind) -> Config {
        let site = SiteConfig {
            backend,
            ..SiteConfig::default()
        };
        Config::new(root, site, Default::default(), Default::default())
    }

    #[test]
    fn test_array_is_always_available() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), BackendKind::Array);
        assert_eq!(write_kind(&config), BackendKind::Array);
        assert_eq!(read_kind(&config, BackendKind::Array), BackendKind::Array);
        assert_eq!(open(&config, BackendKind::Array).kind(), BackendKind::Array);
    }

    #[test]
    fn test_missing_sqlite_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), BackendKind::Sqlite);
        assert_eq!(read_kind(&config, BackendKind::Sqlite), BackendKind::Array);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_selected_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), BackendKind::Sqlite);
        assert_eq!(write_kind(&config), BackendKind::Sqlite);

        let backend = open(&config, BackendKind::Sqlite);
        backend.write(&Default::default()).unwrap();
        assert_eq!(read_kind(&config, BackendKind::Sqlite), BackendKind::Sqlite);
    }
}
