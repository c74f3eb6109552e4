//! Full index rebuilds.
//!
//! A rebuild scans every configured content type, parses and validates each
//! file, and derives five structures in order: the content index, the
//! taxonomy index, the route table, the recent-items window and the slug
//! lookup. They are written through the active backend, after which the
//! fingerprint is persisted, the page cache cleared and diagnostics appended
//! to the rebuild log.

use crate::backends;
use crate::config::{Config, ConfigError, ContentTypeConfig, RegistryTerm, TaxonomyConfig};
use crate::fingerprint::Fingerprint;
use crate::models::ContentRecord;
use crate::page_cache::PageCache;
use crate::parser;
use crate::slug::title_from_slug;
use crate::url::item_url;
use crate::validation::{validate, Diagnostic, DiagnosticKind};
use folio_store::eval::sort_items;
use folio_store::StoreError;
use folio_types::{
    normalize_path, ArchiveRoute, ContentIndex, ExactRoute, IndexBundle, IndexedItem, ItemKey,
    RecentCache, Redirect, RouteTable, SlugEntry, SlugLookup, SortSpec, TaxonomyIndex,
    TaxonomyRoute, TermEntry,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of a rebuild or lint pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildReport {
    /// Items written to the content index
    pub items: usize,
    /// Advisory problems; the files are still indexed
    pub diagnostics: Vec<Diagnostic>,
    /// Files that could not be parsed and were skipped
    pub failures: Vec<Diagnostic>,
}

impl RebuildReport {
    /// Failures first, then diagnostics.
    pub fn all(&self) -> impl Iterator<Item = &Diagnostic> {
        self.failures.iter().chain(self.diagnostics.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.failures.is_empty()
    }
}

/// Term display names seen in frontmatter, keyed by `(taxonomy, slug)`.
type TermNames = BTreeMap<(String, String), String>;

/// Per-item state that does not live in the index itself.
#[derive(Default)]
struct Scan {
    content: ContentIndex,
    redirect_from: BTreeMap<ItemKey, Vec<String>>,
    term_names: TermNames,
}

pub struct Indexer {
    config: Arc<Config>,
    pages: Option<Arc<dyn PageCache>>,
}

impl Indexer {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            pages: None,
        }
    }

    /// Page cache cleared after every successful rebuild.
    pub fn with_page_cache(mut self, pages: Arc<dyn PageCache>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Does the persisted fingerprint match the site as it is now?
    pub fn is_cache_fresh(&self) -> bool {
        let current = Fingerprint::compute(&self.config);
        match Fingerprint::load(&self.config.fingerprint_path()) {
            Some(saved) => saved == current,
            None => false,
        }
    }

    /// Rescan everything and replace all derived indexes.
    ///
    /// Content problems never fail a rebuild; they are returned in the
    /// report and appended to the rebuild log.
    pub fn rebuild(&self) -> Result<RebuildReport, IndexError> {
        let fingerprint = Fingerprint::compute(&self.config);
        let (bundle, report) = self.build()?;

        let kind = backends::write_kind(&self.config);
        let backend = backends::open(&self.config, kind);
        backend.write(&bundle)?;
        fingerprint.save(&self.config.fingerprint_path())?;

        if let Some(pages) = &self.pages {
            if let Err(e) = pages.clear() {
                tracing::warn!("Failed to clear page cache: {}", e);
            }
        }
        self.append_log(&report)?;

        tracing::info!(
            "Indexed {} items through the {} backend ({} diagnostics, {} failures)",
            report.items,
            kind.as_str(),
            report.diagnostics.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Validation problems and parse failures, without writing anything.
    pub fn lint(&self) -> Result<Vec<Diagnostic>, IndexError> {
        let (_, report) = self.build()?;
        Ok(report.all().cloned().collect())
    }

    /// Scan and derive every index structure in memory.
    pub fn build(&self) -> Result<(IndexBundle, RebuildReport), IndexError> {
        let mut report = RebuildReport::default();
        let registries = self.load_registries()?;

        let scan = self.scan(&registries, &mut report);
        let taxonomies = self.build_taxonomies(&scan, &registries);
        let routes = self.build_routes(&scan, &mut report);
        let recent = self.build_recent(&scan.content);
        let slugs = build_slugs(&scan.content);

        report.items = scan.content.len();
        let bundle = IndexBundle {
            content: scan.content,
            taxonomies,
            routes,
            recent,
            slugs,
        };
        Ok((bundle, report))
    }

    fn load_registries(&self) -> Result<BTreeMap<String, Vec<RegistryTerm>>, IndexError> {
        let mut registries = BTreeMap::new();
        for name in self.config.taxonomies.keys() {
            let terms = self.config.term_registry(name)?;
            if !terms.is_empty() {
                tracing::debug!("Loaded {} registry terms for {}", terms.len(), name);
                registries.insert(name.clone(), terms);
            }
        }
        Ok(registries)
    }

    fn scan(
        &self,
        registries: &BTreeMap<String, Vec<RegistryTerm>>,
        report: &mut RebuildReport,
    ) -> Scan {
        let mut scan = Scan::default();
        let mut id_owner: BTreeMap<String, PathBuf> = BTreeMap::new();
        let content_dir = self.config.content_dir();

        for (type_name, type_config) in &self.config.content_types {
            scan.content.by_type.entry(type_name.clone()).or_default();

            let type_dir = self.config.type_dir(type_name);
            let files = discover_markdown_files(&type_dir);
            tracing::debug!("Found {} files for type {}", files.len(), type_name);

            for path in files {
                let relative = relative_path(&path, &content_dir);
                let type_relative = relative_path(&path, &type_dir);

                let record = match fs::read(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        parser::parse(&bytes, &path, &relative, type_name)
                            .map_err(|e| e.to_string())
                    }) {
                    Ok(record) => record,
                    Err(message) => {
                        tracing::warn!("Failed to parse {:?}: {}", path, message);
                        report
                            .failures
                            .push(Diagnostic::new(&path, DiagnosticKind::Structural { message }));
                        continue;
                    }
                };

                report.diagnostics.extend(
                    validate(&record)
                        .into_iter()
                        .map(|kind| Diagnostic::new(&path, kind)),
                );

                let key = record.key();
                if let Some(existing) = scan.content.get(&key) {
                    tracing::warn!("Duplicate slug {} in {:?}", key, path);
                    report.diagnostics.push(Diagnostic::new(
                        &path,
                        DiagnosticKind::DuplicateSlug {
                            content_type: key.content_type.clone(),
                            slug: key.slug.clone(),
                            first: PathBuf::from(&existing.file_path),
                        },
                    ));
                    continue;
                }

                if let Some(id) = &record.id {
                    match id_owner.get(id) {
                        Some(first) => {
                            tracing::warn!("Duplicate id {} in {:?}", id, path);
                            report.diagnostics.push(Diagnostic::new(
                                &path,
                                DiagnosticKind::DuplicateId {
                                    id: id.clone(),
                                    first: first.clone(),
                                },
                            ));
                        }
                        None => {
                            id_owner.insert(id.clone(), path.clone());
                        }
                    }
                }

                let taxonomies =
                    self.assign_terms(type_config, &record, registries, &mut scan.term_names, report);
                let url = item_url(type_name, type_config, &record, &type_relative);
                if !record.redirect_from.is_empty() {
                    scan.redirect_from
                        .insert(key, record.redirect_from.clone());
                }
                let mut item = record.to_indexed(url, taxonomies);
                if !type_config.search.enabled {
                    item.body.clear();
                }
                scan.content.insert(item);
            }
        }

        scan
    }

    /// Resolve the item's taxonomy assignments, dropping unregistered terms
    /// where the taxonomy forbids them and adding ancestors where it rolls
    /// hierarchies up.
    fn assign_terms(
        &self,
        type_config: &ContentTypeConfig,
        record: &ContentRecord,
        registries: &BTreeMap<String, Vec<RegistryTerm>>,
        term_names: &mut TermNames,
        report: &mut RebuildReport,
    ) -> BTreeMap<String, Vec<String>> {
        let mut assigned = BTreeMap::new();

        for taxonomy in &type_config.taxonomies {
            let Some(tax_config) = self.config.taxonomies.get(taxonomy) else {
                continue;
            };
            let known: Option<BTreeSet<&str>> = (!tax_config.behaviour.allow_unknown_terms)
                .then(|| {
                    registries
                        .get(taxonomy)
                        .map(|terms| terms.iter().map(|t| t.slug.as_str()).collect())
                        .unwrap_or_default()
                });
            let allowed = |slug: &str| known.as_ref().map_or(true, |k| k.contains(slug));

            let mut slugs: Vec<String> = Vec::new();
            for (slug, name) in record.terms(taxonomy, tax_config.hierarchical) {
                if !allowed(slug.as_str()) {
                    report.diagnostics.push(Diagnostic::new(
                        &record.file_path,
                        DiagnosticKind::UnknownTerm {
                            taxonomy: taxonomy.clone(),
                            term: slug,
                        },
                    ));
                    continue;
                }
                term_names
                    .entry((taxonomy.clone(), slug.clone()))
                    .or_insert(name);
                if !slugs.contains(&slug) {
                    slugs.push(slug);
                }
            }

            if tax_config.hierarchical && tax_config.behaviour.hierarchy_rollup {
                let ancestors: Vec<String> = slugs.iter().flat_map(|s| ancestors(s)).collect();
                for ancestor in ancestors {
                    if allowed(ancestor.as_str()) && !slugs.contains(&ancestor) {
                        slugs.push(ancestor);
                    }
                }
            }

            if !slugs.is_empty() {
                assigned.insert(taxonomy.clone(), slugs);
            }
        }

        assigned
    }

    fn build_taxonomies(
        &self,
        scan: &Scan,
        registries: &BTreeMap<String, Vec<RegistryTerm>>,
    ) -> TaxonomyIndex {
        let mut index = TaxonomyIndex::new();

        for (taxonomy, tax_config) in &self.config.taxonomies {
            let mut terms: BTreeMap<String, TermEntry> = BTreeMap::new();

            for item in published(&scan.content) {
                let Some(slugs) = item.taxonomies.get(taxonomy) else {
                    continue;
                };
                for slug in slugs {
                    let entry = terms.entry(slug.clone()).or_insert_with(|| {
                        observed_term(taxonomy, slug, tax_config, &scan.term_names)
                    });
                    entry.items.push(item.key().to_string());
                }
            }

            for registered in registries.get(taxonomy).into_iter().flatten() {
                let entry = terms
                    .entry(registered.slug.clone())
                    .or_insert_with(|| empty_term(&registered.slug));
                entry.name = registered.name.clone();
                entry.description = registered.description.clone();
                entry.parent = registered.parent.clone();
                entry.extra = registered.extra_fields();
            }

            for term in terms.values_mut() {
                term.count = term.items.len();
            }
            index.insert(taxonomy.clone(), terms);
        }

        index
    }

    fn build_routes(&self, scan: &Scan, report: &mut RebuildReport) -> RouteTable {
        let mut routes = RouteTable::default();

        for item in published(&scan.content) {
            let path = normalize_path(&item.url);
            if let Some(existing) = routes.exact.get(&path) {
                let first = scan
                    .content
                    .get(&ItemKey::new(&existing.content_type, &existing.slug))
                    .map(|i| PathBuf::from(&i.file_path))
                    .unwrap_or_default();
                report.diagnostics.push(Diagnostic::new(
                    &item.file_path,
                    DiagnosticKind::DuplicateRoute { path, first },
                ));
                continue;
            }

            let template = item.template.clone().or_else(|| {
                self.config
                    .content_types
                    .get(&item.content_type)
                    .and_then(|t| t.templates.single.clone())
            });
            routes.exact.insert(
                path.clone(),
                ExactRoute {
                    content_type: item.content_type.clone(),
                    slug: item.slug.clone(),
                    template,
                },
            );

            for source in scan.redirect_from.get(&item.key()).into_iter().flatten() {
                let source = normalize_path(source);
                if source != path {
                    routes.redirects.entry(source).or_insert_with(|| Redirect {
                        to: path.clone(),
                        status: 301,
                    });
                }
            }
        }

        for (type_name, type_config) in &self.config.content_types {
            if let Some(archive) = &type_config.url.archive {
                routes.archives.insert(
                    normalize_path(archive),
                    ArchiveRoute {
                        content_type: type_name.clone(),
                        template: type_config.templates.archive.clone(),
                    },
                );
            }
        }

        for (name, tax_config) in &self.config.taxonomies {
            if tax_config.public {
                routes.taxonomy.insert(
                    name.clone(),
                    TaxonomyRoute {
                        base: tax_config.base(name),
                        hierarchical: tax_config.hierarchical,
                        separator: tax_config.separator().to_string(),
                    },
                );
            }
        }

        routes
    }

    fn build_recent(&self, content: &ContentIndex) -> RecentCache {
        let limit = self.config.site.recent_cache_size;
        let newest_first = SortSpec::default();

        content
            .by_type
            .iter()
            .map(|(type_name, items)| {
                let cache_fields = self
                    .config
                    .content_types
                    .get(type_name)
                    .map(|t| t.cache_fields.as_slice())
                    .unwrap_or_default();

                let mut window: Vec<IndexedItem> = items
                    .values()
                    .filter(|i| i.status.is_published())
                    .cloned()
                    .collect();
                sort_items(&mut window, &newest_first);
                window.truncate(limit);

                let projected = window.iter().map(|i| i.to_recent(cache_fields)).collect();
                (type_name.clone(), projected)
            })
            .collect()
    }

    fn append_log(&self, report: &RebuildReport) -> Result<(), IndexError> {
        let path = self.config.rebuild_log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut log = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        writeln!(
            log,
            "[{stamp}] rebuild: {} items, {} diagnostics, {} failures",
            report.items,
            report.diagnostics.len(),
            report.failures.len()
        )?;
        for diagnostic in report.all() {
            writeln!(log, "[{stamp}] {diagnostic}")?;
        }
        Ok(())
    }
}

fn published(content: &ContentIndex) -> impl Iterator<Item = &IndexedItem> {
    content
        .by_type
        .values()
        .flat_map(|items| items.values())
        .filter(|item| item.status.is_published())
}

fn build_slugs(content: &ContentIndex) -> SlugLookup {
    content
        .by_type
        .iter()
        .map(|(type_name, items)| {
            let entries = items
                .values()
                .map(|item| {
                    (
                        item.slug.clone(),
                        SlugEntry {
                            file_path: item.file_path.clone(),
                            id: item.id.clone(),
                            status: item.status.clone(),
                        },
                    )
                })
                .collect();
            (type_name.clone(), entries)
        })
        .collect()
}

/// `a/b/c` → `[a, a/b]`
fn ancestors(slug: &str) -> Vec<String> {
    let parts: Vec<&str> = slug.split('/').collect();
    (1..parts.len()).map(|n| parts[..n].join("/")).collect()
}

fn empty_term(slug: &str) -> TermEntry {
    TermEntry {
        slug: slug.to_string(),
        name: title_from_slug(slug.rsplit('/').next().unwrap_or(slug)),
        description: None,
        parent: None,
        count: 0,
        items: Vec::new(),
        extra: BTreeMap::new(),
    }
}

fn observed_term(
    taxonomy: &str,
    slug: &str,
    tax_config: &TaxonomyConfig,
    names: &TermNames,
) -> TermEntry {
    let mut term = empty_term(slug);
    if let Some(name) = names.get(&(taxonomy.to_string(), slug.to_string())) {
        term.name = name.clone();
    }
    if tax_config.hierarchical {
        term.parent = slug.rsplit_once('/').map(|(parent, _)| parent.to_string());
    }
    term
}

/// Markdown files under `dir`, in file-name order.
fn discover_markdown_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        tracing::debug!("Content directory {:?} does not exist", dir);
        return Vec::new();
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .map(|e| e.into_path())
        .collect()
}

/// `path` relative to `base` with `/` separators.
fn relative_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
