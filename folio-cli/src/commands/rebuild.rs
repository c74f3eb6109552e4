//! Rebuild command implementation.

use anyhow::{Context, Result};
use folio_core::Engine;
use std::path::Path;

pub fn rebuild(root: &Path, json: bool) -> Result<()> {
    let mut engine = Engine::open(root).context("Failed to load site configuration")?;
    let report = engine.rebuild().context("Failed to rebuild index")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Indexed {} items ({} diagnostics, {} failures)",
        report.items,
        report.diagnostics.len(),
        report.failures.len()
    );
    for diagnostic in report.all() {
        println!("- {}", diagnostic);
    }
    Ok(())
}
