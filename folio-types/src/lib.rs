//! Shared types for folio
//!
//! This crate holds the serializable shapes that move between the indexer,
//! the storage backends and the query layer: frontmatter values, indexed
//! item projections, taxonomy terms, the route table and query parameters.

pub mod item;
pub mod query;
pub mod route;
pub mod search;
pub mod value;

pub use item::{
    ContentIndex, IndexBundle, IndexedItem, ItemKey, RecentCache, RecentItem, SlugEntry,
    SlugLookup, TaxonomyIndex, TermEntry,
};
pub use query::{
    clamp_page, clamp_per_page, page_offset, Direction, FieldFilter, Operator, Pagination, QueryParams,
    QueryResult, SortSpec, DEFAULT_PER_PAGE, MAX_PER_PAGE,
};
pub use route::{
    normalize_path, ArchiveRoute, ExactRoute, Redirect, RouteMatch, RouteTable, TaxonomyRoute,
};
pub use search::{default_stop_words, default_synonyms, SearchSpec, SearchWeights};
pub use value::{FieldValue, Status};
