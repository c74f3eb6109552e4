//! Core data model for parsed content.

use crate::slug::{slugify, slugify_path};
use folio_types::{FieldValue, IndexedItem, ItemKey, Status};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One parsed content file: known frontmatter fields, the residual map and
/// the raw Markdown body.
///
/// Records are values. Attaching derived data (URL, rendered HTML) returns a
/// new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub slug: String,
    pub title: String,
    pub status: Status,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub excerpt: Option<String>,
    pub template: Option<String>,
    /// Old paths that should redirect here
    pub redirect_from: Vec<String>,
    /// Residual frontmatter, including taxonomy assignments
    pub fields: BTreeMap<String, FieldValue>,
    pub body: String,
    pub file_path: PathBuf,
    pub relative_path: String,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl ContentRecord {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.content_type, &self.slug)
    }

    pub fn with_html(self, html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..self
        }
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..self
        }
    }

    /// Core fields by name, falling back to the residual frontmatter.
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
            "url" => opt(&self.url),
            "path" | "relative_path" => FieldValue::text(&self.relative_path),
            other => self.fields.get(other).cloned().unwrap_or_default(),
        }
    }

    /// Terms assigned to `taxonomy` as `(slug, display name)` pairs, in
    /// frontmatter order and without duplicates. Accepts a single string or
    /// a list. Hierarchical terms keep their `/` separators.
    pub fn terms(&self, taxonomy: &str, hierarchical: bool) -> Vec<(String, String)> {
        let raw: Vec<String> = match self.fields.get(taxonomy) {
            Some(FieldValue::List(items)) => items.iter().filter_map(FieldValue::to_text).collect(),
            Some(value) => value.to_text().into_iter().collect(),
            None => Vec::new(),
        };

        let mut seen = Vec::new();
        let mut out = Vec::new();
        for name in raw {
            let slug = if hierarchical {
                slugify_path(&name)
            } else {
                slugify(&name)
            };
            if slug.is_empty() || seen.contains(&slug) {
                continue;
            }
            seen.push(slug.clone());
            out.push((slug, name.trim().to_string()));
        }
        out
    }

    /// Project into the index form. The body is kept for relevance search.
    pub fn to_indexed(&self, url: String, taxonomies: BTreeMap<String, Vec<String>>) -> IndexedItem {
        IndexedItem {
            content_type: self.content_type.clone(),
            slug: self.slug.clone(),
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status.clone(),
            date: self.date.clone(),
            updated: self.updated.clone(),
            excerpt: self.excerpt.clone(),
            template: self.template.clone(),
            file_path: self.file_path.to_string_lossy().into_owned(),
            relative_path: self.relative_path.clone(),
            url,
            taxonomies,
            fields: self.fields.clone(),
            body: self.body.clone(),
        }
    }

    /// Metadata-only record built from an index entry without touching the
    /// source file. The body is left empty.
    pub fn from_indexed(item: &IndexedItem) -> Self {
        let mut fields = item.fields.clone();
        for (taxonomy, terms) in &item.taxonomies {
            fields.entry(taxonomy.clone()).or_insert_with(|| {
                FieldValue::List(terms.iter().map(FieldValue::text).collect())
            });
        }
        Self {
            id: item.id.clone(),
            content_type: item.content_type.clone(),
            slug: item.slug.clone(),
            title: item.title.clone(),
            status: item.status.clone(),
            date: item.date.clone(),
            updated: item.updated.clone(),
            excerpt: item.excerpt.clone(),
            template: item.template.clone(),
            redirect_from: Vec::new(),
            fields,
            body: String::new(),
            file_path: PathBuf::from(&item.file_path),
            relative_path: item.relative_path.clone(),
            url: Some(item.url.clone()),
            html: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ContentRecord {
        ContentRecord {
            id: Some("01HX".into()),
            content_type: "post".into(),
            slug: "hello".into(),
            title: "Hello".into(),
            status: Status::Published,
            date: Some("2024-03-01".into()),
            updated: None,
            excerpt: None,
            template: None,
            redirect_from: vec![],
            fields: BTreeMap::from([
                (
                    "tags".to_string(),
                    FieldValue::from(vec!["Rust Lang", "rust-lang", "Web"]),
                ),
                ("category".to_string(), FieldValue::text("Guides/Intro")),
            ]),
            body: "Body".into(),
            file_path: PathBuf::from("/site/content/posts/hello.md"),
            relative_path: "posts/hello.md".into(),
            url: None,
            html: None,
        }
    }

    #[test]
    fn test_terms_dedupe_and_slugify() {
        let r = record();
        assert_eq!(
            r.terms("tags", false),
            vec![
                ("rust-lang".to_string(), "Rust Lang".to_string()),
                ("web".to_string(), "Web".to_string()),
            ]
        );
        assert_eq!(
            r.terms("category", true),
            vec![("guides/intro".to_string(), "Guides/Intro".to_string())]
        );
        assert_eq!(
            r.terms("category", false),
            vec![("guidesintro".to_string(), "Guides/Intro".to_string())]
        );
        assert!(r.terms("missing", false).is_empty());
    }

    #[test]
    fn test_with_html_returns_new_value() {
        let r = record();
        let rendered = r.clone().with_html("<p>Body</p>");
        assert!(r.html.is_none());
        assert_eq!(rendered.html.as_deref(), Some("<p>Body</p>"));
    }

    #[test]
    fn test_indexed_projection() {
        let r = record();
        let item = r.to_indexed("/blog/hello".into(), BTreeMap::new());
        assert_eq!(item.file_path, "/site/content/posts/hello.md");
        assert_eq!(item.field("date"), FieldValue::text("2024-03-01"));

        let meta = ContentRecord::from_indexed(&item);
        assert_eq!(meta.url.as_deref(), Some("/blog/hello"));
        assert!(meta.body.is_empty());
        assert_eq!(meta.key(), r.key());
    }
}
