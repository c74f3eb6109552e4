//! Staleness detection.
//!
//! A fingerprint records, for the content root and the config root, the
//! newest file mtime and the file count, plus a blake3 hash of each of the
//! three named config files. The index is fresh exactly when the current
//! fingerprint equals the persisted one. A same-size edit that keeps the
//! mtime goes unnoticed; that is accepted.

use crate::config::Config;
use folio_store::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirState {
    pub max_mtime_ns: u64,
    pub file_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Keyed by `content` / `config`
    pub directories: BTreeMap<String, DirState>,
    /// Config file name → blake3 hex, `None` when absent
    pub config_files: BTreeMap<String, Option<String>>,
}

/// Walk `dir`, skipping anything under `exclude`.
pub fn dir_state(dir: &Path, exclude: &Path) -> DirState {
    let mut state = DirState::default();
    if !dir.exists() {
        return state;
    }

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(exclude))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        state.file_count += 1;
        let mtime = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        state.max_mtime_ns = state.max_mtime_ns.max(mtime);
    }
    state
}

/// blake3 of a file's contents as hex; `None` when unreadable.
pub fn hash_file(path: &Path) -> Option<String> {
    std::fs::read(path)
        .ok()
        .map(|bytes| blake3::hash(&bytes).to_hex().to_string())
}

impl Fingerprint {
    /// Compute the fingerprint of the site as it is on disk now.
    pub fn compute(config: &Config) -> Self {
        let exclude = config.cache_dir();
        let mut directories = BTreeMap::new();
        directories.insert(
            "content".to_string(),
            dir_state(&config.content_dir(), &exclude),
        );
        directories.insert(
            "config".to_string(),
            dir_state(&config.config_dir(), &exclude),
        );

        let config_files = config
            .hashed_files()
            .iter()
            .map(|path| (file_label(path), hash_file(path)))
            .collect();

        Self {
            directories,
            config_files,
        }
    }

    /// Read the persisted fingerprint; `None` when missing or unreadable.
    pub fn load(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(fp) => Some(fp),
            Err(err) => {
                tracing::warn!("Ignoring unreadable fingerprint {:?}: {}", path, err);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> folio_store::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
