//! Indexed item projections and the derived index structures.

use crate::route::RouteTable;
use crate::value::{FieldValue, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// `type/slug` key identifying one item across all indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub content_type: String,
    pub slug: String,
}

impl ItemKey {
    pub fn new(content_type: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            slug: slug.into(),
        }
    }

    /// Parse the `type/slug` form used in taxonomy item lists.
    pub fn parse(key: &str) -> Option<Self> {
        let (content_type, slug) = key.split_once('/')?;
        if content_type.is_empty() || slug.is_empty() {
            return None;
        }
        Some(Self::new(content_type, slug))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type, self.slug)
    }
}

/// Metadata for one content file as held by the full content index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedItem {
    pub content_type: String,
    pub slug: String,
    pub id: Option<String>,
    pub title: String,
    pub status: Status,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub excerpt: Option<String>,
    pub template: Option<String>,
    /// Absolute path of the source file
    pub file_path: String,
    /// Path relative to the content root, `/`-separated
    pub relative_path: String,
    pub url: String,
    /// Taxonomy name -> term slugs (including rolled-up ancestors)
    pub taxonomies: BTreeMap<String, Vec<String>>,
    /// Residual frontmatter fields
    pub fields: BTreeMap<String, FieldValue>,
    /// Searchable body text; empty when search is disabled for the type
    pub body: String,
}

impl IndexedItem {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.content_type, &self.slug)
    }

    /// Look up a sortable/filterable value: core fields first, then the
    /// residual frontmatter map.
    pub fn field(&self, name: &str) -> FieldValue {
        let opt = |v: &Option<String>| v.clone().map(FieldValue::Text).unwrap_or_default();
        match name {
            "id" => opt(&self.id),
            "type" => FieldValue::text(&self.content_type),
            "slug" => FieldValue::text(&self.slug),
            "title" => FieldValue::text(&self.title),
            "status" => FieldValue::text(self.status.as_str()),
            "date" => opt(&self.date),
            "updated" => opt(&self.updated),
            "excerpt" => opt(&self.excerpt),
            "template" => opt(&self.template),
            "url" => FieldValue::text(&self.url),
            "path" | "relative_path" => FieldValue::text(&self.relative_path),
            other => self.fields.get(other).cloned().unwrap_or_default(),
        }
    }

    pub fn has_term(&self, taxonomy: &str, term: &str) -> bool {
        self.taxonomies
            .get(taxonomy)
            .is_some_and(|terms| terms.iter().any(|t| t == term))
    }

    /// Project into the minimal recent-cache shape, keeping only `cache_fields`.
    pub fn to_recent(&self, cache_fields: &[String]) -> RecentItem {
        RecentItem {
            content_type: self.content_type.clone(),
            slug: self.slug.clone(),
            id: self.id.clone(),
            title: self.title.clone(),
            date: self.date.clone(),
            updated: self.updated.clone(),
            excerpt: self.excerpt.clone(),
            template: self.template.clone(),
            file_path: self.file_path.clone(),
            relative_path: self.relative_path.clone(),
            url: self.url.clone(),
            fields: cache_fields
                .iter()
                .filter_map(|f| self.fields.get(f).map(|v| (f.clone(), v.clone())))
                .collect(),
        }
    }
}

/// Minimal projection served by the recent-items fast path.
/// Only published items are ever projected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentItem {
    pub content_type: String,
    pub slug: String,
    pub id: Option<String>,
    pub title: String,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub excerpt: Option<String>,
    pub template: Option<String>,
    pub file_path: String,
    pub relative_path: String,
    pub url: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RecentItem {
    pub fn into_indexed(self) -> IndexedItem {
        IndexedItem {
            content_type: self.content_type,
            slug: self.slug,
            id: self.id,
            title: self.title,
            status: Status::Published,
            date: self.date,
            updated: self.updated,
            excerpt: self.excerpt,
            template: self.template,
            file_path: self.file_path,
            relative_path: self.relative_path,
            url: self.url,
            taxonomies: BTreeMap::new(),
            fields: self.fields,
            body: String::new(),
        }
    }
}

/// Existence/path record for O(1) single-item resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugEntry {
    pub file_path: String,
    pub id: Option<String>,
    pub status: Status,
}

/// One term of one taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    /// Parent term slug for hierarchical taxonomies
    pub parent: Option<String>,
    /// Always equals `items.len()`
    pub count: usize,
    /// `type/slug` keys of published items carrying the term
    pub items: Vec<String>,
    /// Extra registry metadata
    pub extra: BTreeMap<String, FieldValue>,
}

/// Full content index: the primary `by_type` map plus key maps for id and path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentIndex {
    pub by_type: BTreeMap<String, BTreeMap<String, IndexedItem>>,
    pub by_id: BTreeMap<String, ItemKey>,
    pub by_path: BTreeMap<String, ItemKey>,
}

impl ContentIndex {
    pub fn get(&self, key: &ItemKey) -> Option<&IndexedItem> {
        self.by_type.get(&key.content_type)?.get(&key.slug)
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an item; returns `false` (leaving the index untouched) when the
    /// `(type, slug)` slot is already taken. The first item seen keeps an id.
    pub fn insert(&mut self, item: IndexedItem) -> bool {
        let slot = self.by_type.entry(item.content_type.clone()).or_default();
        if slot.contains_key(&item.slug) {
            return false;
        }
        let key = item.key();
        if let Some(id) = &item.id {
            self.by_id.entry(id.clone()).or_insert_with(|| key.clone());
        }
        self.by_path.insert(item.relative_path.clone(), key);
        slot.insert(item.slug.clone(), item);
        true
    }
}

pub type TaxonomyIndex = BTreeMap<String, BTreeMap<String, TermEntry>>;
pub type RecentCache = BTreeMap<String, Vec<RecentItem>>;
pub type SlugLookup = BTreeMap<String, BTreeMap<String, SlugEntry>>;

/// All five derived structures produced by one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexBundle {
    pub content: ContentIndex,
    pub taxonomies: TaxonomyIndex,
    pub routes: RouteTable,
    pub recent: RecentCache,
    pub slugs: SlugLookup,
}
