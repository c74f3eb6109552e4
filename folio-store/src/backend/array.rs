//! In-memory backend over signed snapshot files.
//!
//! Each of the five structures lives in its own file and is loaded on first
//! use, then kept for the lifetime of the backend (or until
//! [`Backend::clear_memory_cache`]). A missing, unsigned or corrupt file
//! loads as an empty structure.

use super::{window_fits, Backend, BackendKind, DEFAULT_RECENT_LIMIT};
use crate::atomic::write_atomic;
use crate::envelope::SnapshotCodec;
use crate::error::Result;
use crate::eval;
use folio_types::{
    page_offset, ContentIndex, IndexBundle, IndexedItem, QueryParams, QueryResult, RecentCache, RouteTable,
    SlugEntry, SlugLookup, TaxonomyIndex, TermEntry,
};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CONTENT_FILE: &str = "content.idx";
const TAXONOMY_FILE: &str = "taxonomies.idx";
const ROUTES_FILE: &str = "routes.idx";
const RECENT_FILE: &str = "recent.idx";
const SLUGS_FILE: &str = "slugs.idx";

/// Load-once slot for one snapshot structure.
struct Slot<T> {
    file: &'static str,
    value: Mutex<Option<Arc<T>>>,
}

impl<T: DeserializeOwned + Default> Slot<T> {
    fn new(file: &'static str) -> Self {
        Self {
            file,
            value: Mutex::new(None),
        }
    }

    fn get(&self, dir: &Path, codec: &SnapshotCodec) -> Arc<T> {
        let mut guard = self.value.lock();
        if let Some(value) = guard.as_ref() {
            return Arc::clone(value);
        }
        let loaded = Arc::new(load_snapshot(&dir.join(self.file), codec));
        *guard = Some(Arc::clone(&loaded));
        loaded
    }

    fn clear(&self) {
        *self.value.lock() = None;
    }
}

fn load_snapshot<T: DeserializeOwned + Default>(path: &Path, codec: &SnapshotCodec) -> T {
    match fs::read(path) {
        Ok(bytes) => codec.decode(&bytes).unwrap_or_else(|| {
            tracing::warn!("Ignoring unreadable index snapshot {}", path.display());
            T::default()
        }),
        Err(err) => {
            tracing::debug!("No index snapshot at {}: {}", path.display(), err);
            T::default()
        }
    }
}

pub struct ArrayBackend {
    dir: PathBuf,
    codec: SnapshotCodec,
    recent_limit: usize,
    content: Slot<ContentIndex>,
    taxonomies: Slot<TaxonomyIndex>,
    routes: Slot<RouteTable>,
    recent: Slot<RecentCache>,
    slugs: Slot<SlugLookup>,
}

impl std::fmt::Debug for ArrayBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayBackend")
            .field("dir", &self.dir)
            .field("codec", &self.codec)
            .field("recent_limit", &self.recent_limit)
            .finish_non_exhaustive()
    }
}

impl ArrayBackend {
    pub fn new(dir: impl Into<PathBuf>, codec: SnapshotCodec) -> Self {
        Self {
            dir: dir.into(),
            codec,
            recent_limit: DEFAULT_RECENT_LIMIT,
            content: Slot::new(CONTENT_FILE),
            taxonomies: Slot::new(TAXONOMY_FILE),
            routes: Slot::new(ROUTES_FILE),
            recent: Slot::new(RECENT_FILE),
            slugs: Slot::new(SLUGS_FILE),
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths of every snapshot file this backend reads and writes.
    pub fn snapshot_paths(&self) -> Vec<PathBuf> {
        [CONTENT_FILE, TAXONOMY_FILE, ROUTES_FILE, RECENT_FILE, SLUGS_FILE]
            .iter()
            .map(|f| self.dir.join(f))
            .collect()
    }

    fn content(&self) -> Arc<ContentIndex> {
        self.content.get(&self.dir, &self.codec)
    }

    fn write_one<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        write_atomic(&self.dir.join(file), &bytes)
    }
}

impl Backend for ArrayBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Array
    }

    fn write(&self, bundle: &IndexBundle) -> Result<()> {
        self.write_one(CONTENT_FILE, &bundle.content)?;
        self.write_one(TAXONOMY_FILE, &bundle.taxonomies)?;
        self.write_one(ROUTES_FILE, &bundle.routes)?;
        self.write_one(RECENT_FILE, &bundle.recent)?;
        self.write_one(SLUGS_FILE, &bundle.slugs)?;
        self.clear_memory_cache();
        tracing::debug!(
            "Wrote {} items to array snapshots in {}",
            bundle.content.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn get_by_slug(&self, content_type: &str, slug: &str) -> Result<Option<IndexedItem>> {
        Ok(self
            .content()
            .by_type
            .get(content_type)
            .and_then(|items| items.get(slug))
            .cloned())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<IndexedItem>> {
        let content = self.content();
        Ok(content
            .by_id
            .get(id)
            .and_then(|key| content.get(key))
            .cloned())
    }

    fn get_by_path(&self, relative_path: &str) -> Result<Option<IndexedItem>> {
        let content = self.content();
        Ok(content
            .by_path
            .get(relative_path)
            .and_then(|key| content.get(key))
            .cloned())
    }

    fn all_raw(&self, content_type: &str) -> Result<Vec<IndexedItem>> {
        Ok(self
            .content()
            .by_type
            .get(content_type)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    fn types(&self) -> Result<Vec<String>> {
        Ok(self.content().by_type.keys().cloned().collect())
    }

    fn count(&self, content_type: &str, status: Option<&str>) -> Result<usize> {
        let slugs = self.slugs.get(&self.dir, &self.codec);
        Ok(slugs
            .get(content_type)
            .map(|entries| {
                entries
                    .values()
                    .filter(|e| status.map_or(true, |s| e.status.as_str() == s))
                    .count()
            })
            .unwrap_or(0))
    }

    fn exists(&self, content_type: &str, slug: &str) -> Result<bool> {
        Ok(self.slug_entry(content_type, slug)?.is_some())
    }

    fn slug_entry(&self, content_type: &str, slug: &str) -> Result<Option<SlugEntry>> {
        let slugs = self.slugs.get(&self.dir, &self.codec);
        Ok(slugs
            .get(content_type)
            .and_then(|entries| entries.get(slug))
            .cloned())
    }

    fn query(&self, params: &QueryParams) -> Result<QueryResult> {
        let content = self.content();
        let candidates: Vec<IndexedItem> = match &params.content_type {
            Some(content_type) => content
                .by_type
                .get(content_type)
                .map(|items| items.values().cloned().collect())
                .unwrap_or_default(),
            None => content
                .by_type
                .values()
                .flat_map(|items| items.values().cloned())
                .collect(),
        };
        Ok(eval::execute(candidates, params))
    }

    fn can_use_fast_cache(&self, content_type: &str, page: usize, per_page: usize) -> Result<bool> {
        let recent = self.recent.get(&self.dir, &self.codec);
        Ok(recent
            .get(content_type)
            .is_some_and(|items| window_fits(items.len(), self.recent_limit, page, per_page)))
    }

    fn recent_items(&self, content_type: &str, page: usize, per_page: usize) -> Result<QueryResult> {
        let recent = self.recent.get(&self.dir, &self.codec);
        let Some(window) = recent.get(content_type) else {
            return Ok(QueryResult::default());
        };

        let total = if window.len() < self.recent_limit {
            window.len()
        } else {
            self.count(content_type, Some("published"))?
        };
        let offset = page_offset(page, per_page);
        let items = window
            .iter()
            .skip(offset)
            .take(per_page)
            .cloned()
            .map(|item| item.into_indexed())
            .collect();
        Ok(QueryResult { items, total })
    }

    fn terms(&self, taxonomy: &str) -> Result<Vec<TermEntry>> {
        let taxonomies = self.taxonomies.get(&self.dir, &self.codec);
        Ok(taxonomies
            .get(taxonomy)
            .map(|terms| terms.values().cloned().collect())
            .unwrap_or_default())
    }

    fn term(&self, taxonomy: &str, slug: &str) -> Result<Option<TermEntry>> {
        let taxonomies = self.taxonomies.get(&self.dir, &self.codec);
        Ok(taxonomies
            .get(taxonomy)
            .and_then(|terms| terms.get(slug))
            .cloned())
    }

    fn taxonomies(&self) -> Result<Vec<String>> {
        let taxonomies = self.taxonomies.get(&self.dir, &self.codec);
        Ok(taxonomies.keys().cloned().collect())
    }

    fn routes(&self) -> Result<RouteTable> {
        Ok((*self.routes.get(&self.dir, &self.codec)).clone())
    }

    fn clear_memory_cache(&self) {
        self.content.clear();
        self.taxonomies.clear();
        self.routes.clear();
        self.recent.clear();
        self.slugs.clear();
    }
}
