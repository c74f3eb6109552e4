//! The engine wires configuration, indexer, repository and page cache
//! together for one site root.

use crate::config::{Config, ConfigError};
use crate::indexer::{IndexError, Indexer, RebuildReport};
use crate::models::ContentRecord;
use crate::page_cache::{FilePageCache, PageCache};
use crate::repository::{Repository, RepositoryError};
use folio_types::{normalize_path, Pagination, RouteMatch, TermEntry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What a request path resolves to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Page {
        template: Option<String>,
        record: ContentRecord,
    },
    Redirect {
        to: String,
        status: u16,
    },
    Archive {
        content_type: String,
        template: Option<String>,
        items: Vec<ContentRecord>,
        pagination: Pagination,
    },
    TaxonomyIndex {
        taxonomy: String,
        terms: Vec<TermEntry>,
    },
    Term {
        taxonomy: String,
        term: TermEntry,
        items: Vec<ContentRecord>,
        pagination: Pagination,
    },
}

pub struct Engine {
    root: PathBuf,
    config: Arc<Config>,
    indexer: Indexer,
    repository: Repository,
    pages: Arc<dyn PageCache>,
}

impl Engine {
    /// Load `config/` under `root` and set up the site's services.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = Arc::new(Config::load(&root)?);
        Ok(Self::with_config(root, config))
    }

    fn with_config(root: PathBuf, config: Arc<Config>) -> Self {
        let pages: Arc<dyn PageCache> = Arc::new(FilePageCache::new(config.pages_dir()));
        Self {
            root,
            indexer: Indexer::new(config.clone()).with_page_cache(pages.clone()),
            repository: Repository::new(config.clone()),
            config,
            pages,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn pages(&self) -> &dyn PageCache {
        self.pages.as_ref()
    }

    /// Rebuild now, whatever the fingerprint says.
    pub fn rebuild(&mut self) -> Result<RebuildReport> {
        self.reload()?;
        let report = self.indexer.rebuild()?;
        self.repository.reset();
        Ok(report)
    }

    /// Rebuild when the site changed since the last rebuild. Config is
    /// reloaded first since it may be what changed.
    pub fn ensure_fresh(&mut self) -> Result<Option<RebuildReport>> {
        if self.indexer.is_cache_fresh() {
            tracing::debug!("Index is fresh");
            return Ok(None);
        }
        tracing::info!("Index is stale, rebuilding");
        self.rebuild().map(Some)
    }

    fn reload(&mut self) -> Result<()> {
        let config = Arc::new(Config::load(&self.root)?);
        *self = Self::with_config(self.root.clone(), config);
        Ok(())
    }

    /// Resolve `path` and gather what a template needs to render it.
    /// Listing routes use page `page`.
    pub fn render(&self, path: &str, page: i64) -> Result<Option<Rendered>> {
        let Some(route) = self.repository.route_for(path)? else {
            return Ok(None);
        };

        let rendered = match route {
            RouteMatch::Redirect(redirect) => Rendered::Redirect {
                to: redirect.to,
                status: redirect.status,
            },
            RouteMatch::Content(exact) => {
                let Some(record) = self.repository.get(&exact.content_type, &exact.slug)? else {
                    return Ok(None);
                };
                let record = self.with_cached_html(path, record);
                Rendered::Page {
                    template: exact.template,
                    record,
                }
            }
            RouteMatch::Archive(archive) => {
                let query = self
                    .repository
                    .query()
                    .type_(&archive.content_type)
                    .page(page);
                Rendered::Archive {
                    items: query.get()?,
                    pagination: query.pagination()?,
                    content_type: archive.content_type,
                    template: archive.template,
                }
            }
            RouteMatch::Taxonomy {
                taxonomy,
                term: None,
                ..
            } => Rendered::TaxonomyIndex {
                terms: self.repository.terms(&taxonomy)?,
                taxonomy,
            },
            RouteMatch::Taxonomy {
                taxonomy,
                term: Some(slug),
                ..
            } => {
                let Some(term) = self.repository.term(&taxonomy, &slug)? else {
                    return Ok(None);
                };
                let query = self
                    .repository
                    .query()
                    .where_tax(&taxonomy, &slug)
                    .page(page);
                Rendered::Term {
                    items: query.get()?,
                    pagination: query.pagination()?,
                    taxonomy,
                    term,
                }
            }
        };
        Ok(Some(rendered))
    }

    fn with_cached_html(&self, path: &str, record: ContentRecord) -> ContentRecord {
        let key = normalize_path(path);
        if let Some(html) = self.pages.get(&key) {
            return record.with_html(html);
        }
        let record = self.repository.render(record);
        if let Some(html) = &record.html {
            if let Err(e) = self.pages.put(&key, html) {
                tracing::warn!("Failed to cache page {}: {}", key, e);
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(
            root.join("config/content_types.yml"),
            "post:\n  content_dir: posts\n  url:\n    type: pattern\n    pattern: /blog/{slug}\n    archive: /blog\n  taxonomies: [category]\n",
        )
        .unwrap();
        fs::write(
            root.join("config/taxonomies.yml"),
            "category:\n  hierarchical: true\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("content/posts")).unwrap();
        fs::write(
            root.join("content/posts/hello.md"),
            "---\ntitle: Hello\nstatus: published\ndate: 2024-05-01\ncategory: Lang/Rust\nredirect_from: /hi\n---\n# Hello\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_ensure_fresh_rebuilds_once() {
        let dir = site();
        let mut engine = Engine::open(dir.path()).unwrap();
        assert!(engine.ensure_fresh().unwrap().is_some());
        assert!(engine.ensure_fresh().unwrap().is_none());
    }

    #[test]
    fn test_render_routes() {
        let dir = site();
        let mut engine = Engine::open(dir.path()).unwrap();
        engine.ensure_fresh().unwrap();

        match engine.render("/blog/hello", 1).unwrap() {
            Some(Rendered::Page { record, .. }) => {
                assert!(record.html.unwrap().contains("<h1>Hello</h1>"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(engine.pages().get("/blog/hello").is_some());

        assert!(matches!(
            engine.render("/hi", 1).unwrap(),
            Some(Rendered::Redirect { status: 301, .. })
        ));
        match engine.render("/blog", 1).unwrap() {
            Some(Rendered::Archive { items, pagination, .. }) => {
                assert_eq!(items.len(), 1);
                assert_eq!(pagination.total, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        match engine.render("/category/lang/rust", 1).unwrap() {
            Some(Rendered::Term { term, items, .. }) => {
                assert_eq!(term.parent.as_deref(), Some("lang"));
                assert_eq!(items[0].slug, "hello");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            engine.render("/category", 1).unwrap(),
            Some(Rendered::TaxonomyIndex { terms, .. }) if terms.len() == 1
        ));
        assert!(engine.render("/category/none", 1).unwrap().is_none());
        assert!(engine.render("/missing", 1).unwrap().is_none());
    }

    #[test]
    fn test_rebuild_clears_page_cache() {
        let dir = site();
        let mut engine = Engine::open(dir.path()).unwrap();
        engine.ensure_fresh().unwrap();
        engine.render("/blog/hello", 1).unwrap();
        engine.rebuild().unwrap();
        assert!(engine.pages().get("/blog/hello").is_none());
    }
}
