//! Content file parsing: frontmatter → [`ContentRecord`] with defaults.

use crate::frontmatter::{parse_frontmatter, yaml_key, yaml_scalar, yaml_strings, yaml_to_field};
use crate::models::ContentRecord;
use crate::slug::title_from_slug;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use folio_types::Status;
use std::collections::BTreeMap;
use std::path::Path;

pub use crate::frontmatter::FrontmatterError as ParseError;

const CORE_KEYS: &[&str] = &[
    "id",
    "slug",
    "title",
    "status",
    "date",
    "updated",
    "excerpt",
    "template",
    "redirect_from",
];

/// Parse one content file.
///
/// Missing `slug` defaults to the file stem (the parent directory name for
/// `index` files), missing `title` to the title-cased slug and missing
/// `status` to draft. Dates in a recognised format are normalized; anything
/// else is kept verbatim for validation to report.
pub fn parse(
    bytes: &[u8],
    file_path: &Path,
    relative_path: &str,
    content_type: &str,
) -> Result<ContentRecord, ParseError> {
    let source = String::from_utf8_lossy(bytes);
    let (frontmatter, body) = parse_frontmatter(&source)?;

    let mut core: BTreeMap<&str, &serde_yaml::Value> = BTreeMap::new();
    let mut fields = BTreeMap::new();
    for (key, value) in &frontmatter {
        let Some(key) = yaml_key(key) else { continue };
        match CORE_KEYS.iter().find(|k| **k == key) {
            Some(core_key) => {
                core.insert(*core_key, value);
            }
            None => {
                fields.insert(key, yaml_to_field(value));
            }
        }
    }

    let scalar = |name: &str| core.get(name).and_then(|v| yaml_scalar(v));
    let non_empty = |name: &str| scalar(name).filter(|s| !s.trim().is_empty());

    let slug = match core.get("slug") {
        Some(value) => yaml_scalar(value).unwrap_or_default(),
        None => default_slug(file_path),
    };
    let title = match core.get("title") {
        Some(value) => yaml_scalar(value).unwrap_or_default(),
        None => title_from_slug(&slug),
    };
    let status = scalar("status")
        .map(|s| Status::parse(&s))
        .unwrap_or_default();

    Ok(ContentRecord {
        id: non_empty("id").map(|s| s.trim().to_string()),
        content_type: content_type.to_string(),
        slug,
        title,
        status,
        date: non_empty("date").map(|d| normalize_date(&d).unwrap_or(d)),
        updated: non_empty("updated").map(|d| normalize_date(&d).unwrap_or(d)),
        excerpt: non_empty("excerpt"),
        template: non_empty("template"),
        redirect_from: core
            .get("redirect_from")
            .map(|v| yaml_strings(v))
            .unwrap_or_default(),
        fields,
        body,
        file_path: file_path.to_path_buf(),
        relative_path: relative_path.to_string(),
        url: None,
        html: None,
    })
}

fn default_slug(file_path: &Path) -> String {
    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem == "index" {
        if let Some(parent) = file_path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
        {
            return parent;
        }
    }
    stem
}

/// Canonical form of a date string: `YYYY-MM-DD` stays as is, datetimes
/// become RFC 3339 (naive times are taken as UTC). `None` when the string
/// is not a recognised date.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(
                Utc.from_utc_datetime(&naive)
                    .to_rfc3339_opts(SecondsFormat::AutoSi, false),
            );
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::FieldValue;
    use std::path::PathBuf;

    fn parse_str(source: &str, path: &str) -> ContentRecord {
        parse(source.as_bytes(), &PathBuf::from(path), path, "post").unwrap()
    }

    #[test]
    fn test_defaults() {
        let record = parse_str("Just a body\n", "/c/posts/getting-started.md");
        assert_eq!(record.slug, "getting-started");
        assert_eq!(record.title, "Getting Started");
        assert_eq!(record.status, Status::Draft);
        assert_eq!(record.body, "Just a body\n");
        assert!(record.date.is_none());
    }

    #[test]
    fn test_index_file_takes_directory_slug() {
        let record = parse_str("body", "/c/docs/install/index.md");
        assert_eq!(record.slug, "install");
    }

    #[test]
    fn test_core_and_residual_fields() {
        let source = r#"---
id: 01HXYZ
title: "  Hello  "
slug: hello
status: published
date: 2024-03-01
excerpt: Short
redirect_from: /old-hello
tags: [rust, web]
rating: 4
---
Body
"#;
        let record = parse_str(source, "/c/posts/x.md");
        assert_eq!(record.id.as_deref(), Some("01HXYZ"));
        assert_eq!(record.title, "Hello");
        assert_eq!(record.slug, "hello");
        assert_eq!(record.status, Status::Published);
        assert_eq!(record.date.as_deref(), Some("2024-03-01"));
        assert_eq!(record.excerpt.as_deref(), Some("Short"));
        assert_eq!(record.redirect_from, vec!["/old-hello".to_string()]);
        assert_eq!(record.fields["rating"], FieldValue::Int(4));
        assert!(!record.fields.contains_key("title"));
        assert_eq!(record.body, "Body\n");
    }

    #[test]
    fn test_explicit_empty_title_is_kept_for_validation() {
        let record = parse_str("---\ntitle: \"\"\n---\n", "/c/posts/a.md");
        assert_eq!(record.title, "");
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let record = parse_str("---\nstatus: archived\n---\n", "/c/posts/a.md");
        assert_eq!(record.status, Status::Other("archived".into()));
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-01-05").as_deref(), Some("2024-01-05"));
        assert_eq!(
            normalize_date("2024-01-05 10:30:00").as_deref(),
            Some("2024-01-05T10:30:00+00:00")
        );
        assert_eq!(
            normalize_date("2024-01-05T10:30:00+02:00").as_deref(),
            Some("2024-01-05T10:30:00+02:00")
        );
        assert_eq!(normalize_date("next tuesday"), None);
    }

    #[test]
    fn test_structural_errors() {
        let path = PathBuf::from("/c/posts/a.md");
        assert!(matches!(
            parse(b"---\ntitle: x\n", &path, "posts/a.md", "post"),
            Err(ParseError::Unterminated)
        ));
        assert!(matches!(
            parse(b"---\n[1, 2]\n---\n", &path, "posts/a.md", "post"),
            Err(ParseError::NotAMap)
        ));
    }
}
