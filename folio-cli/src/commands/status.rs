//! Index status for operators.

use anyhow::{Context, Result};
use folio_core::Engine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
struct TypeCounts {
    total: usize,
    published: usize,
}

#[derive(Serialize)]
struct StatusSummary {
    fresh: bool,
    backend: &'static str,
    types: BTreeMap<String, TypeCounts>,
    taxonomies: BTreeMap<String, usize>,
}

pub fn status(root: &Path, json: bool) -> Result<()> {
    let engine = Engine::open(root).context("Failed to load site configuration")?;
    let repo = engine.repository();

    let mut types = BTreeMap::new();
    for content_type in repo.types()? {
        let counts = TypeCounts {
            total: repo.count(&content_type, None)?,
            published: repo.count(&content_type, Some("published"))?,
        };
        types.insert(content_type, counts);
    }
    let mut taxonomies = BTreeMap::new();
    for taxonomy in repo.taxonomies()? {
        let terms = repo.terms(&taxonomy)?.len();
        taxonomies.insert(taxonomy, terms);
    }

    let summary = StatusSummary {
        fresh: engine.indexer().is_cache_fresh(),
        backend: repo.backend().kind().as_str(),
        types,
        taxonomies,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Index: {} ({} backend)",
        if summary.fresh { "fresh" } else { "stale" },
        summary.backend
    );
    for (name, counts) in &summary.types {
        println!("  {}: {} items, {} published", name, counts.total, counts.published);
    }
    for (name, terms) in &summary.taxonomies {
        println!("  {}: {} terms", name, terms);
    }
    Ok(())
}
