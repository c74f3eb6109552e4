//! Site configuration: `config/site.yml`, `config/content_types.yml`,
//! `config/taxonomies.yml` and optional term registries under `config/terms/`.

use folio_store::{BackendKind, Serializer, DEFAULT_RECENT_LIMIT};
use folio_types::{
    default_stop_words, default_synonyms, normalize_path, Direction, FieldValue, SearchSpec,
    SearchWeights, SortSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_DIR: &str = "config";
pub const SITE_FILE: &str = "site.yml";
pub const CONTENT_TYPES_FILE: &str = "content_types.yml";
pub const TAXONOMIES_FILE: &str = "taxonomies.yml";
pub const TERMS_DIR: &str = "terms";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `config/site.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub content_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub backend: BackendKind,
    pub serializer: Serializer,
    pub signing_key: Option<String>,
    pub recent_cache_size: usize,
    pub search: SiteSearchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            cache_dir: PathBuf::from(".folio/cache"),
            backend: BackendKind::default(),
            serializer: Serializer::default(),
            signing_key: None,
            recent_cache_size: DEFAULT_RECENT_LIMIT,
            search: SiteSearchConfig::default(),
        }
    }
}

/// Site-wide additions to the built-in synonym and stop-word tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSearchConfig {
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub stop_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStrategy {
    #[default]
    Hierarchical,
    Pattern,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    #[serde(rename = "type")]
    pub strategy: UrlStrategy,
    /// Template with `{slug}`, `{id}`, `{yyyy}`, `{mm}`, `{dd}` placeholders
    pub pattern: Option<String>,
    /// Archive listing path for the type
    pub archive: Option<String>,
    /// Prefix for hierarchical URLs
    pub base: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub single: Option<String>,
    pub archive: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortingConfig {
    pub field: String,
    pub direction: String,
}

impl Default for SortingConfig {
    fn default() -> Self {
        Self {
            field: "date".to_string(),
            direction: "desc".to_string(),
        }
    }
}

impl SortingConfig {
    pub fn to_sort_spec(&self) -> SortSpec {
        SortSpec::new(self.field.clone(), Direction::parse(&self.direction))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSearchConfig {
    pub enabled: bool,
    /// Extra frontmatter fields scored per token hit
    pub fields: Vec<String>,
    pub weights: Option<SearchWeights>,
}

impl Default for TypeSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fields: Vec::new(),
            weights: None,
        }
    }
}

/// One entry of `config/content_types.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentTypeConfig {
    /// Directory under the content root; defaults to the type name
    pub content_dir: Option<PathBuf>,
    pub url: UrlConfig,
    pub templates: TemplateConfig,
    pub taxonomies: Vec<String>,
    pub sorting: SortingConfig,
    pub search: TypeSearchConfig,
    /// Residual fields projected into the recent-items window
    pub cache_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub base: Option<String>,
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourConfig {
    pub allow_unknown_terms: bool,
    pub hierarchy_rollup: bool,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            allow_unknown_terms: true,
            hierarchy_rollup: false,
        }
    }
}

/// One entry of `config/taxonomies.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    pub label: Option<String>,
    pub hierarchical: bool,
    pub public: bool,
    pub rewrite: RewriteConfig,
    pub behaviour: BehaviourConfig,
    pub ui: Option<serde_yaml::Value>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            label: None,
            hierarchical: false,
            public: true,
            rewrite: RewriteConfig::default(),
            behaviour: BehaviourConfig::default(),
            ui: None,
        }
    }
}

impl TaxonomyConfig {
    /// Normalized route base, `/<name>` unless rewritten.
    pub fn base(&self, name: &str) -> String {
        normalize_path(self.rewrite.base.as_deref().unwrap_or(name))
    }

    /// Joins hierarchical term segments in URLs; `/` unless rewritten.
    pub fn separator(&self) -> &str {
        self.rewrite
            .separator
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("/")
    }
}

/// A term declared in `config/terms/<taxonomy>.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryTerm {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RegistryTerm {
    pub fn extra_fields(&self) -> BTreeMap<String, FieldValue> {
        self.extra
            .iter()
            .map(|(k, v)| (k.clone(), crate::frontmatter::yaml_to_field(v)))
            .collect()
    }
}

/// Everything loaded from a site's `config/` directory.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub site: SiteConfig,
    pub content_types: BTreeMap<String, ContentTypeConfig>,
    pub taxonomies: BTreeMap<String, TaxonomyConfig>,

    // Site root, for relative path resolution
    root: PathBuf,
}

fn read_yaml<T>(path: &Path) -> Result<Option<T>, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

impl Config {
    /// Load the configuration of the site rooted at `root`. Missing files
    /// fall back to defaults.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self, ConfigError> {
        let root = root.as_ref().to_path_buf();
        let dir = root.join(CONFIG_DIR);

        let config = Self {
            site: read_yaml(&dir.join(SITE_FILE))?.unwrap_or_default(),
            content_types: read_yaml(&dir.join(CONTENT_TYPES_FILE))?.unwrap_or_default(),
            taxonomies: read_yaml(&dir.join(TAXONOMIES_FILE))?.unwrap_or_default(),
            root,
        };
        config.validate()?;

        tracing::debug!(
            "Loaded config: {} content types, {} taxonomies",
            config.content_types.len(),
            config.taxonomies.len()
        );
        Ok(config)
    }

    /// Build a configuration in memory, rooted at `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        site: SiteConfig,
        content_types: BTreeMap<String, ContentTypeConfig>,
        taxonomies: BTreeMap<String, TaxonomyConfig>,
    ) -> Self {
        Self {
            site,
            content_types,
            taxonomies,
            root: root.into(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.site.recent_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "recent_cache_size must be at least 1".into(),
            ));
        }
        for (name, ty) in &self.content_types {
            if ty.url.strategy == UrlStrategy::Pattern && ty.url.pattern.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "content type '{name}' uses pattern URLs without a pattern"
                )));
            }
            if let Some(tax) = ty.taxonomies.iter().find(|t| !self.taxonomies.contains_key(*t)) {
                return Err(ConfigError::Invalid(format!(
                    "content type '{name}' references unknown taxonomy '{tax}'"
                )));
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.site.content_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_path(&self.site.cache_dir)
    }

    /// Snapshot directory of the array backend.
    pub fn index_dir(&self) -> PathBuf {
        self.cache_dir().join("index")
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.cache_dir().join("index.sqlite")
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        self.cache_dir().join("fingerprint.json")
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.cache_dir().join("pages")
    }

    pub fn rebuild_log_path(&self) -> PathBuf {
        self.cache_dir().join("rebuild.log")
    }

    /// The three named files whose contents are hashed into the fingerprint.
    pub fn hashed_files(&self) -> [PathBuf; 3] {
        let dir = self.config_dir();
        [
            dir.join(SITE_FILE),
            dir.join(CONTENT_TYPES_FILE),
            dir.join(TAXONOMIES_FILE),
        ]
    }

    /// Directory holding the files of one content type.
    pub fn type_dir(&self, name: &str) -> PathBuf {
        let sub = self
            .content_types
            .get(name)
            .and_then(|t| t.content_dir.clone())
            .unwrap_or_else(|| PathBuf::from(name));
        let content = self.content_dir();
        if sub.is_absolute() {
            sub
        } else {
            content.join(sub)
        }
    }

    /// Ordered term registry for `taxonomy`; empty when no file exists.
    pub fn term_registry(&self, taxonomy: &str) -> Result<Vec<RegistryTerm>, ConfigError> {
        let path = self
            .config_dir()
            .join(TERMS_DIR)
            .join(format!("{taxonomy}.yml"));
        Ok(read_yaml(&path)?.unwrap_or_default())
    }

    /// A search spec for `term` with the site's synonym and stop-word
    /// additions merged over the built-in tables.
    pub fn search_spec(&self, term: &str) -> SearchSpec {
        let mut spec = SearchSpec::new(term);
        let mut synonyms = default_synonyms();
        for (word, extra) in &self.site.search.synonyms {
            let entry = synonyms.entry(word.to_lowercase()).or_default();
            for s in extra {
                let s = s.to_lowercase();
                if !entry.contains(&s) {
                    entry.push(s);
                }
            }
        }
        let mut stop_words = default_stop_words();
        stop_words.extend(self.site.search.stop_words.iter().map(|s| s.to_lowercase()));
        spec.synonyms = synonyms;
        spec.stop_words = stop_words;
        spec.excluded_types = self
            .content_types
            .iter()
            .filter(|(_, t)| !t.search.enabled)
            .map(|(name, _)| name.clone())
            .collect();
        spec
    }

    /// Resolve a path relative to the site root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
