//! Lint content files without touching the index.

use anyhow::{bail, Context, Result};
use folio_core::{Config, Indexer};
use std::path::Path;
use std::sync::Arc;

pub fn lint(root: &Path, json: bool, strict: bool) -> Result<()> {
    let config = Config::load(root).context("Failed to load site configuration")?;
    let diagnostics = Indexer::new(Arc::new(config))
        .lint()
        .context("Failed to scan content")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else if diagnostics.is_empty() {
        println!("No problems found");
    } else {
        for diagnostic in &diagnostics {
            println!("{}", diagnostic);
        }
    }

    if strict && !diagnostics.is_empty() {
        bail!("{} problems found", diagnostics.len());
    }
    Ok(())
}
