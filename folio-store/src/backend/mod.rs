//! The storage backend contract and its two implementations.

use crate::error::Result;
use folio_types::{IndexBundle, IndexedItem, QueryParams, QueryResult, RouteTable, SlugEntry, TermEntry};
use serde::{Deserialize, Serialize};

pub mod array;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Size of the per-type recent-items window.
pub const DEFAULT_RECENT_LIMIT: usize = 200;

/// Which backend a site is configured to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Snapshot files loaded into memory
    #[default]
    Array,
    /// Embedded SQLite database
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Array => "array",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

/// Persisted index storage.
///
/// Both implementations must answer every read identically for the same
/// written [`IndexBundle`]. Reads of missing or corrupt data return empty
/// results rather than errors; errors are reserved for genuine IO/database
/// failures.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Replace all stored structures with `bundle`. Readers never observe a
    /// partially written state.
    fn write(&self, bundle: &IndexBundle) -> Result<()>;

    fn get_by_slug(&self, content_type: &str, slug: &str) -> Result<Option<IndexedItem>>;
    fn get_by_id(&self, id: &str) -> Result<Option<IndexedItem>>;
    fn get_by_path(&self, relative_path: &str) -> Result<Option<IndexedItem>>;

    /// Every item of a type, ordered by slug.
    fn all_raw(&self, content_type: &str) -> Result<Vec<IndexedItem>>;
    fn types(&self) -> Result<Vec<String>>;
    fn count(&self, content_type: &str, status: Option<&str>) -> Result<usize>;
    fn exists(&self, content_type: &str, slug: &str) -> Result<bool>;
    /// Path/id/status only, without loading full metadata.
    fn slug_entry(&self, content_type: &str, slug: &str) -> Result<Option<SlugEntry>>;

    fn query(&self, params: &QueryParams) -> Result<QueryResult>;

    /// True when the requested page of published items, newest first, can be
    /// served from the recent-items window.
    fn can_use_fast_cache(&self, content_type: &str, page: usize, per_page: usize) -> Result<bool>;
    /// Published items of a type, date descending, one page of them.
    fn recent_items(&self, content_type: &str, page: usize, per_page: usize) -> Result<QueryResult>;

    /// Terms of a taxonomy ordered by slug.
    fn terms(&self, taxonomy: &str) -> Result<Vec<TermEntry>>;
    fn term(&self, taxonomy: &str, slug: &str) -> Result<Option<TermEntry>>;
    fn taxonomies(&self) -> Result<Vec<String>>;
    fn routes(&self) -> Result<RouteTable>;

    /// Drop in-process cached state; the next read goes back to storage.
    fn clear_memory_cache(&self);
}

/// Does page `page` of size `per_page` fit a recent window holding `cached`
/// items out of a maximum of `limit`? A window shorter than its limit holds
/// every published item, so any page fits.
pub(crate) fn window_fits(cached: usize, limit: usize, page: usize, per_page: usize) -> bool {
    cached < limit || page.max(1).saturating_mul(per_page) <= cached
}
