//! URL generation for content items.

use crate::config::{ContentTypeConfig, UrlStrategy};
use crate::models::ContentRecord;
use folio_types::normalize_path;

/// Public URL of `record`.
///
/// `type_relative` is the record's path relative to its content-type
/// directory (e.g. `guides/install/index.md`).
pub fn item_url(
    type_name: &str,
    config: &ContentTypeConfig,
    record: &ContentRecord,
    type_relative: &str,
) -> String {
    match config.url.strategy {
        UrlStrategy::Hierarchical => {
            let base = config.url.base.as_deref().unwrap_or(type_name);
            hierarchical_url(base, type_relative)
        }
        UrlStrategy::Pattern => {
            let pattern = config.url.pattern.as_deref().unwrap_or("/{slug}");
            pattern_url(pattern, type_name, record)
        }
    }
}

/// `base` + the file path, without `.md`, with `index` files collapsed to
/// their directory.
pub fn hierarchical_url(base: &str, type_relative: &str) -> String {
    let normalized = type_relative.replace('\\', "/");
    let without_ext = normalized.strip_suffix(".md").unwrap_or(&normalized);
    let mut segments: Vec<&str> = without_ext.split('/').filter(|s| !s.is_empty()).collect();
    if segments.last() == Some(&"index") {
        segments.pop();
    }
    normalize_path(&format!("{}/{}", base, segments.join("/")))
}

/// Substitute `{slug}`, `{id}`, `{type}`, `{yyyy}`, `{mm}` and `{dd}`.
/// Missing values substitute as empty segments, which normalization drops.
pub fn pattern_url(pattern: &str, type_name: &str, record: &ContentRecord) -> String {
    let date = record.date.as_deref().unwrap_or_default();
    let part = |range: std::ops::Range<usize>| date.get(range).unwrap_or_default();

    let url = pattern
        .replace("{slug}", &record.slug)
        .replace("{id}", record.id.as_deref().unwrap_or_default())
        .replace("{type}", type_name)
        .replace("{yyyy}", part(0..4))
        .replace("{mm}", part(5..7))
        .replace("{dd}", part(8..10));
    normalize_path(&url)
}
