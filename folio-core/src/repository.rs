//! Read-only access to indexed content.
//!
//! The repository sits in front of whichever [`Backend`] the site resolves
//! to. Metadata reads (`*_meta`) never touch source files; full reads
//! re-parse the file the index points at to recover the body.

use crate::backends;
use crate::config::Config;
use crate::frontmatter::FrontmatterError;
use crate::markdown;
use crate::models::ContentRecord;
use crate::parser;
use crate::query::Query;
use crate::url::item_url;
use folio_store::eval::sort_items;
use folio_store::{Backend, BackendKind, StoreError};
use folio_types::{IndexedItem, ItemKey, RouteMatch, SortSpec, TermEntry};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Content file missing: {0:?}")]
    FileMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

pub struct Repository {
    config: Arc<Config>,
    backend: Mutex<Option<Arc<dyn Backend>>>,
    forced: Mutex<Option<BackendKind>>,
    html: RwLock<BTreeMap<ItemKey, String>>,
}

impl Repository {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            backend: Mutex::new(None),
            forced: Mutex::new(None),
            html: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The active backend, resolved on first use and then kept.
    pub fn backend(&self) -> Arc<dyn Backend> {
        let mut slot = self.backend.lock();
        if let Some(backend) = slot.as_ref() {
            return backend.clone();
        }

        let forced = *self.forced.lock();
        let requested = forced.unwrap_or(self.config.site.backend);
        let kind = backends::read_kind(&self.config, requested);
        tracing::debug!("Resolved {} backend", kind.as_str());
        let backend = backends::open(&self.config, kind);
        *slot = Some(backend.clone());
        backend
    }

    /// Force a backend kind; the cached backend is dropped and re-resolved
    /// on the next read.
    pub fn override_backend(&self, kind: BackendKind) {
        *self.forced.lock() = Some(kind);
        self.reset();
    }

    /// Forget the cached backend and rendered HTML.
    pub fn reset(&self) {
        if let Some(backend) = self.backend.lock().take() {
            backend.clear_memory_cache();
        }
        self.html.write().clear();
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    // Full records

    pub fn get(&self, content_type: &str, slug: &str) -> Result<Option<ContentRecord>> {
        self.backend()
            .get_by_slug(content_type, slug)?
            .map(|item| self.hydrate(&item))
            .transpose()
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<ContentRecord>> {
        self.backend()
            .get_by_id(id)?
            .map(|item| self.hydrate(&item))
            .transpose()
    }

    /// Look up by path relative to the content root, e.g. `posts/hello.md`.
    pub fn get_by_path(&self, relative_path: &str) -> Result<Option<ContentRecord>> {
        self.backend()
            .get_by_path(relative_path)?
            .map(|item| self.hydrate(&item))
            .transpose()
    }

    /// Every item of a type with bodies loaded, ordered by slug.
    pub fn all(&self, content_type: &str) -> Result<Vec<ContentRecord>> {
        self.backend()
            .all_raw(content_type)?
            .iter()
            .map(|item| self.hydrate(item))
            .collect()
    }

    /// Parse a content file directly, bypassing the index.
    ///
    /// Relative paths resolve against the content root. The content type is
    /// the configured type whose directory holds the file.
    pub fn get_file(&self, path: &Path) -> Result<ContentRecord> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.content_dir().join(path)
        };
        if !path.is_file() {
            return Err(RepositoryError::FileMissing(path));
        }

        let content_dir = self.config.content_dir();
        let relative = relative_to(&path, &content_dir);
        let owner = self
            .config
            .content_types
            .iter()
            .find(|(name, _)| path.starts_with(self.config.type_dir(name)));

        let content_type = owner
            .map(|(name, _)| name.clone())
            .or_else(|| relative.split('/').next().map(str::to_string))
            .unwrap_or_default();
        let bytes = std::fs::read(&path)?;
        let record = parser::parse(&bytes, &path, &relative, &content_type)?;

        Ok(match owner {
            Some((name, type_config)) => {
                let type_relative = relative_to(&path, &self.config.type_dir(name));
                let url = item_url(name, type_config, &record, &type_relative);
                record.with_url(url)
            }
            None => record,
        })
    }

    /// Re-read the source file behind an index entry.
    pub fn hydrate(&self, item: &IndexedItem) -> Result<ContentRecord> {
        let path = PathBuf::from(&item.file_path);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::FileMissing(path));
            }
            Err(e) => return Err(e.into()),
        };
        let record = parser::parse(&bytes, &path, &item.relative_path, &item.content_type)?;
        Ok(record.with_url(item.url.clone()))
    }

    // Metadata only

    pub fn all_meta(&self, content_type: &str) -> Result<Vec<ContentRecord>> {
        Ok(self
            .backend()
            .all_raw(content_type)?
            .iter()
            .map(ContentRecord::from_indexed)
            .collect())
    }

    pub fn published_meta(&self, content_type: &str) -> Result<Vec<ContentRecord>> {
        Ok(self
            .backend()
            .all_raw(content_type)?
            .iter()
            .filter(|item| item.status.is_published())
            .map(ContentRecord::from_indexed)
            .collect())
    }

    /// The newest `limit` items across every type, undated items last.
    ///
    /// Only the final slice is turned into records.
    pub fn recent_meta(&self, limit: usize) -> Result<Vec<ContentRecord>> {
        let backend = self.backend();
        let mut items = Vec::new();
        for content_type in backend.types()? {
            items.extend(backend.all_raw(&content_type)?);
        }
        sort_items(&mut items, &SortSpec::default());

        Ok(items
            .iter()
            .take(limit)
            .map(ContentRecord::from_indexed)
            .collect())
    }

    // Index lookups

    pub fn exists(&self, content_type: &str, slug: &str) -> Result<bool> {
        Ok(self.backend().exists(content_type, slug)?)
    }

    /// Items of a type, optionally restricted to one status.
    pub fn count(&self, content_type: &str, status: Option<&str>) -> Result<usize> {
        Ok(self.backend().count(content_type, status)?)
    }

    pub fn types(&self) -> Result<Vec<String>> {
        Ok(self.backend().types()?)
    }

    pub fn terms(&self, taxonomy: &str) -> Result<Vec<TermEntry>> {
        Ok(self.backend().terms(taxonomy)?)
    }

    pub fn term(&self, taxonomy: &str, slug: &str) -> Result<Option<TermEntry>> {
        Ok(self.backend().term(taxonomy, slug)?)
    }

    pub fn taxonomies(&self) -> Result<Vec<String>> {
        Ok(self.backend().taxonomies()?)
    }

    /// Resolve a request path: redirects, exact content routes, type
    /// archives, then taxonomy bases.
    pub fn route_for(&self, path: &str) -> Result<Option<RouteMatch>> {
        Ok(self.backend().routes()?.resolve(path))
    }

    // Rendering

    /// Rendered HTML of a record's body, memoized per record.
    pub fn html_for(&self, record: &ContentRecord) -> String {
        let key = record.key();
        if let Some(html) = self.html.read().get(&key) {
            return html.clone();
        }
        let html = markdown::render(&record.body);
        self.html.write().insert(key, html.clone());
        html
    }

    /// A copy of `record` with its HTML attached.
    pub fn render(&self, record: ContentRecord) -> ContentRecord {
        let html = self.html_for(&record);
        record.with_html(html)
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use std::fs;

    const CONTENT_TYPES: &str = "\
post:
  content_dir: posts
  url:
    type: pattern
    pattern: /blog/{slug}
    archive: /blog
  taxonomies: [tags]
page:
  content_dir: pages
";

    fn site() -> (tempfile::TempDir, Arc<Config>) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(root.join("config/content_types.yml"), CONTENT_TYPES).unwrap();
        fs::write(root.join("config/taxonomies.yml"), "tags: {}\n").unwrap();

        fs::create_dir_all(root.join("content/posts")).unwrap();
        fs::create_dir_all(root.join("content/pages")).unwrap();
        fs::write(
            root.join("content/posts/first.md"),
            "---\ntitle: First\nstatus: published\ndate: 2024-01-01\nid: P1\ntags: [rust]\n---\nOne *body*\n",
        )
        .unwrap();
        fs::write(
            root.join("content/posts/second.md"),
            "---\ntitle: Second\nstatus: published\ndate: 2024-02-01\n---\nTwo\n",
        )
        .unwrap();
        fs::write(
            root.join("content/pages/about.md"),
            "---\ntitle: About\nstatus: published\nredirect_from: [/about-us]\n---\nAbout\n",
        )
        .unwrap();

        let config = Arc::new(Config::load(root).unwrap());
        Indexer::new(config.clone()).rebuild().unwrap();
        (dir, config)
    }

    #[test]
    fn test_full_reads_hydrate_body() {
        let (_dir, config) = site();
        let repo = Repository::new(config);

        let first = repo.get("post", "first").unwrap().unwrap();
        assert_eq!(first.body.trim(), "One *body*");
        assert_eq!(first.url.as_deref(), Some("/blog/first"));

        assert_eq!(repo.get_by_id("P1").unwrap().unwrap().slug, "first");
        assert_eq!(repo.get_by_path("pages/about.md").unwrap().unwrap().slug, "about");
        assert!(repo.get("post", "missing").unwrap().is_none());

        let all: Vec<_> = repo.all("post").unwrap().into_iter().map(|r| r.slug).collect();
        assert_eq!(all, vec!["first", "second"]);
    }

    #[test]
    fn test_meta_reads_skip_files() {
        let (dir, config) = site();
        let repo = Repository::new(config);
        fs::remove_file(dir.path().join("content/posts/first.md")).unwrap();

        let meta = repo.all_meta("post").unwrap();
        assert_eq!(meta.len(), 2);
        assert!(meta.iter().all(|r| r.body.is_empty()));

        assert!(matches!(
            repo.get("post", "first"),
            Err(RepositoryError::FileMissing(_))
        ));
    }

    #[test]
    fn test_recent_meta_spans_types() {
        let (_dir, config) = site();
        let repo = Repository::new(config);
        let slugs: Vec<_> = repo
            .recent_meta(2)
            .unwrap()
            .into_iter()
            .map(|r| r.slug)
            .collect();
        assert_eq!(slugs, vec!["second", "first"]);

        let all: Vec<_> = repo.recent_meta(10).unwrap().into_iter().map(|r| r.slug).collect();
        assert_eq!(all.last().map(String::as_str), Some("about"));
    }

    #[test]
    fn test_route_for() {
        let (_dir, config) = site();
        let repo = Repository::new(config);

        assert!(matches!(
            repo.route_for("/about-us").unwrap(),
            Some(RouteMatch::Redirect(r)) if r.to == "/page/about"
        ));
        assert!(matches!(
            repo.route_for("/blog/first/").unwrap(),
            Some(RouteMatch::Content(r)) if r.slug == "first"
        ));
        assert!(matches!(
            repo.route_for("/blog").unwrap(),
            Some(RouteMatch::Archive(_))
        ));
        assert!(matches!(
            repo.route_for("/tags/rust").unwrap(),
            Some(RouteMatch::Taxonomy { term: Some(t), .. }) if t == "rust"
        ));
        assert_eq!(repo.route_for("/nope").unwrap(), None);
    }

    #[test]
    fn test_get_file() {
        let (_dir, config) = site();
        let repo = Repository::new(config);

        let record = repo.get_file(Path::new("posts/second.md")).unwrap();
        assert_eq!(record.content_type, "post");
        assert_eq!(record.url.as_deref(), Some("/blog/second"));

        assert!(matches!(
            repo.get_file(Path::new("posts/gone.md")),
            Err(RepositoryError::FileMissing(_))
        ));
    }

    #[test]
    fn test_html_is_memoized() {
        let (_dir, config) = site();
        let repo = Repository::new(config);
        let record = repo.get("post", "first").unwrap().unwrap();
        let html = repo.html_for(&record);
        assert!(html.contains("<em>body</em>"));
        assert_eq!(repo.render(record).html, Some(html));
    }

    #[test]
    fn test_override_backend_re_resolves() {
        let (_dir, config) = site();
        let repo = Repository::new(config);
        assert_eq!(repo.backend().kind(), BackendKind::Array);
        repo.override_backend(BackendKind::Array);
        assert_eq!(repo.count("post", Some("published")).unwrap(), 2);
        assert_eq!(repo.types().unwrap(), vec!["page", "post"]);
    }
}
