//! Fluent content queries.
//!
//! ```ignore
//! let page = repo
//!     .query()
//!     .type_("post")
//!     .where_tax("tags", "rust")
//!     .order_by("title", "asc")
//!     .per_page(20)
//!     .page(2);
//! let items = page.get()?;
//! ```
//!
//! Every configuration call returns a new [`Query`]; the receiver is left
//! untouched. Nothing runs until the first of `get`, `count`, `first`,
//! `is_empty` or `pagination`, and the result is then reused.
//!
//! An unscoped status means `published`; `status("any")` lifts the filter.

use crate::models::ContentRecord;
use crate::repository::{Repository, Result};
use crate::slug::{slugify, slugify_path};
use folio_types::{
    clamp_page, clamp_per_page, Direction, FieldFilter, FieldValue, IndexedItem, Pagination,
    QueryParams, SearchWeights, SortSpec, DEFAULT_PER_PAGE,
};
use once_cell::unsync::OnceCell;

/// Status value that disables status filtering.
pub const ANY_STATUS: &str = "any";

#[derive(Debug)]
struct Resolved {
    items: Vec<IndexedItem>,
    total: usize,
    fast: bool,
}

pub struct Query<'r> {
    repo: &'r Repository,
    content_type: Option<String>,
    status: Option<String>,
    taxonomies: Vec<(String, String)>,
    filters: Vec<FieldFilter>,
    sort: Option<SortSpec>,
    search: Option<String>,
    search_fields: Vec<String>,
    weights: Option<SearchWeights>,
    weights_explicit: bool,
    page: usize,
    per_page: usize,
    resolved: OnceCell<Resolved>,
}

impl<'r> Clone for Query<'r> {
    /// Configuration only; the copy resolves on its own.
    fn clone(&self) -> Self {
        Self {
            repo: self.repo,
            content_type: self.content_type.clone(),
            status: self.status.clone(),
            taxonomies: self.taxonomies.clone(),
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            search: self.search.clone(),
            search_fields: self.search_fields.clone(),
            weights: self.weights,
            weights_explicit: self.weights_explicit,
            page: self.page,
            per_page: self.per_page,
            resolved: OnceCell::new(),
        }
    }
}

impl<'r> Query<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self {
            repo,
            content_type: None,
            status: None,
            taxonomies: Vec::new(),
            filters: Vec::new(),
            sort: None,
            search: None,
            search_fields: Vec::new(),
            weights: None,
            weights_explicit: false,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            resolved: OnceCell::new(),
        }
    }

    fn with(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        f(&mut next);
        next
    }

    /// Scope to one content type. The type's search fields and weights load
    /// here (replacing those of any earlier type) unless weights were already
    /// set explicitly.
    pub fn type_(&self, content_type: &str) -> Self {
        let search = self
            .repo
            .config()
            .content_types
            .get(content_type)
            .map(|t| t.search.clone())
            .unwrap_or_default();
        self.with(|q| {
            q.content_type = Some(content_type.to_string());
            q.search_fields = search.fields;
            if !q.weights_explicit {
                q.weights = search.weights;
            }
        })
    }

    pub fn status(&self, status: &str) -> Self {
        self.with(|q| q.status = Some(status.trim().to_lowercase()))
    }

    /// Require a taxonomy term. Names are slugified the way the indexer
    /// slugifies assignments.
    pub fn where_tax(&self, taxonomy: &str, term: &str) -> Self {
        let hierarchical = self
            .repo
            .config()
            .taxonomies
            .get(taxonomy)
            .is_some_and(|t| t.hierarchical);
        let slug = if hierarchical {
            slugify_path(term)
        } else {
            slugify(term)
        };
        self.with(|q| q.taxonomies.push((taxonomy.to_string(), slug)))
    }

    /// Field filter; `op` is one of `=`, `!=`, `>`, `>=`, `<`, `<=`, `in`,
    /// `not in` or `like`. Anything else matches nothing.
    pub fn where_(&self, field: &str, op: &str, value: impl Into<FieldValue>) -> Self {
        let filter = FieldFilter::new(field, op, value);
        self.with(|q| q.filters.push(filter))
    }

    pub fn order_by(&self, field: &str, direction: &str) -> Self {
        let sort = SortSpec::new(field, Direction::parse(direction));
        self.with(|q| q.sort = Some(sort))
    }

    pub fn per_page(&self, per_page: i64) -> Self {
        self.with(|q| q.per_page = clamp_per_page(per_page))
    }

    pub fn page(&self, page: i64) -> Self {
        self.with(|q| q.page = clamp_page(page))
    }

    /// Free-text relevance search. Results order by score, not by the sort.
    pub fn search(&self, term: &str) -> Self {
        self.with(|q| q.search = Some(term.to_string()))
    }

    /// Override scoring weights. `None` keeps whatever is configured.
    pub fn search_weights(&self, weights: Option<SearchWeights>) -> Self {
        self.with(|q| {
            if let Some(weights) = weights {
                q.weights = Some(weights);
                q.weights_explicit = true;
            }
        })
    }

    /// Effective parameters handed to the backend.
    pub fn params(&self) -> QueryParams {
        let status = match self.status.as_deref() {
            None => Some("published".to_string()),
            Some(ANY_STATUS) => None,
            Some(other) => Some(other.to_string()),
        };

        let sort = self.sort.clone().unwrap_or_else(|| {
            self.content_type
                .as_ref()
                .and_then(|t| self.repo.config().content_types.get(t))
                .map(|t| t.sorting.to_sort_spec())
                .unwrap_or_default()
        });

        let search = self.search.as_ref().map(|term| {
            let mut spec = self.repo.config().search_spec(term);
            spec.fields = self.search_fields.clone();
            if let Some(weights) = self.weights {
                spec.weights = weights;
            }
            spec
        });

        QueryParams {
            content_type: self.content_type.clone(),
            status,
            taxonomies: self.taxonomies.clone(),
            filters: self.filters.clone(),
            search,
            sort,
            page: self.page,
            per_page: self.per_page,
        }
    }

    fn fast_path_candidate(&self, params: &QueryParams) -> Option<String> {
        let content_type = params.content_type.as_ref()?;
        let eligible = params.status.as_deref() == Some("published")
            && params.sort.is_date_desc()
            && params.taxonomies.is_empty()
            && params.filters.is_empty()
            && params.active_search().is_none();
        eligible.then(|| content_type.clone())
    }

    fn resolve(&self) -> Result<&Resolved> {
        self.resolved.get_or_try_init(|| {
            let params = self.params();
            let backend = self.repo.backend();

            if let Some(content_type) = self.fast_path_candidate(&params) {
                if backend.can_use_fast_cache(&content_type, params.page, params.per_page)? {
                    tracing::debug!("Serving {} page {} from recent cache", content_type, params.page);
                    let result = backend.recent_items(&content_type, params.page, params.per_page)?;
                    return Ok(Resolved {
                        items: result.items,
                        total: result.total,
                        fast: true,
                    });
                }
            }

            let result = backend.query(&params)?;
            Ok(Resolved {
                items: result.items,
                total: result.total,
                fast: false,
            })
        })
    }

    /// Index entries of the requested page.
    pub fn raw(&self) -> Result<&[IndexedItem]> {
        Ok(&self.resolve()?.items)
    }

    /// Records of the requested page, metadata only.
    pub fn get(&self) -> Result<Vec<ContentRecord>> {
        Ok(self.raw()?.iter().map(ContentRecord::from_indexed).collect())
    }

    /// Records of the requested page with bodies loaded from disk.
    pub fn get_full(&self) -> Result<Vec<ContentRecord>> {
        self.raw()?
            .iter()
            .map(|item| self.repo.hydrate(item))
            .collect()
    }

    /// Matching items across all pages.
    pub fn count(&self) -> Result<usize> {
        Ok(self.resolve()?.total)
    }

    pub fn first(&self) -> Result<Option<ContentRecord>> {
        Ok(self.raw()?.first().map(ContentRecord::from_indexed))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.resolve()?.items.is_empty())
    }

    pub fn pagination(&self) -> Result<Pagination> {
        let total = self.resolve()?.total;
        Ok(Pagination::new(self.page, self.per_page, total))
    }

    /// Whether the result came from the recent-items window.
    pub fn used_fast_path(&self) -> Result<bool> {
        Ok(self.resolve()?.fast)
    }
}
