//! Query command implementation.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use folio_core::{BackendKind, Engine, Query};
use folio_types::FieldValue;
use serde::Serialize;
use std::path::Path;

#[derive(Copy, Clone, ValueEnum)]
pub enum BackendChoice {
    Array,
    Sqlite,
}

#[derive(Args)]
pub struct QueryOptions {
    /// Content type to query
    #[arg(long = "type")]
    pub content_type: Option<String>,

    /// Status filter; "any" disables it (default: published)
    #[arg(long)]
    pub status: Option<String>,

    /// Taxonomy filter as taxonomy=term (repeatable)
    #[arg(long = "tax")]
    pub taxonomies: Vec<String>,

    /// Field filter as "field op value", e.g. "rating >= 4" (repeatable)
    #[arg(long = "where")]
    pub filters: Vec<String>,

    /// Sort as field or field:asc|desc
    #[arg(long)]
    pub order: Option<String>,

    /// Free-text relevance search
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: i64,

    #[arg(long, default_value_t = 10)]
    pub per_page: i64,

    /// Force a storage backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendChoice>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct QueryOutput {
    items: Vec<folio_core::ContentRecord>,
    total: usize,
    pagination: folio_types::Pagination,
    fast_path: bool,
}

pub fn query(root: &Path, opts: &QueryOptions) -> Result<()> {
    let mut engine = Engine::open(root).context("Failed to load site configuration")?;
    engine.ensure_fresh().context("Failed to refresh index")?;

    let repo = engine.repository();
    if let Some(choice) = opts.backend {
        repo.override_backend(match choice {
            BackendChoice::Array => BackendKind::Array,
            BackendChoice::Sqlite => BackendKind::Sqlite,
        });
    }

    let q = build(repo.query(), opts)?;
    let output = QueryOutput {
        items: q.get()?,
        total: q.count()?,
        pagination: q.pagination()?,
        fast_path: q.used_fast_path()?,
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} results (page {} of {})",
        output.total, output.pagination.current_page, output.pagination.total_pages
    );
    for item in &output.items {
        println!(
            "- {}/{} {} [{}] {}",
            item.content_type,
            item.slug,
            item.date.as_deref().unwrap_or("-"),
            item.status.as_str(),
            item.title
        );
    }
    Ok(())
}

fn build<'r>(mut q: Query<'r>, opts: &QueryOptions) -> Result<Query<'r>> {
    if let Some(content_type) = &opts.content_type {
        q = q.type_(content_type);
    }
    if let Some(status) = &opts.status {
        q = q.status(status);
    }
    for tax in &opts.taxonomies {
        let Some((taxonomy, term)) = tax.split_once('=') else {
            bail!("Taxonomy filter '{}' must look like taxonomy=term", tax);
        };
        q = q.where_tax(taxonomy.trim(), term.trim());
    }
    for filter in &opts.filters {
        let mut parts = filter.trim().splitn(3, char::is_whitespace);
        let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            bail!("Filter '{}' must look like \"field op value\"", filter);
        };
        let op = op.replace('_', " ");
        q = q.where_(field, &op, parse_value(&op, value.trim()));
    }
    if let Some(order) = &opts.order {
        let (field, direction) = order.split_once(':').unwrap_or((order.as_str(), "asc"));
        q = q.order_by(field, direction);
    }
    if let Some(term) = &opts.search {
        q = q.search(term);
    }
    Ok(q.per_page(opts.per_page).page(opts.page))
}

/// Numbers and booleans are typed; `in`/`not in` take comma lists.
fn parse_value(op: &str, raw: &str) -> FieldValue {
    if matches!(op.to_lowercase().as_str(), "in" | "not in") {
        return FieldValue::List(raw.split(',').map(|v| scalar(v.trim())).collect());
    }
    scalar(raw)
}

fn scalar(raw: &str) -> FieldValue {
    if let Ok(n) = raw.parse::<i64>() {
        FieldValue::Int(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        FieldValue::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        FieldValue::Bool(b)
    } else {
        FieldValue::text(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("=", "4"), FieldValue::Int(4));
        assert_eq!(parse_value(">", "2.5"), FieldValue::Float(2.5));
        assert_eq!(parse_value("=", "true"), FieldValue::Bool(true));
        assert_eq!(parse_value("like", "%rust%"), FieldValue::text("%rust%"));
        assert_eq!(
            parse_value("in", "a, 2"),
            FieldValue::List(vec![FieldValue::text("a"), FieldValue::Int(2)])
        );
    }
}
