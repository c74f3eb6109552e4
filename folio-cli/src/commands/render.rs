//! Print the data a template would render for a path.

use anyhow::{bail, Context, Result};
use folio_core::Engine;
use std::path::Path;

pub fn render(root: &Path, path: &str, page: i64) -> Result<()> {
    let mut engine = Engine::open(root).context("Failed to load site configuration")?;
    engine.ensure_fresh().context("Failed to refresh index")?;

    match engine.render(path, page)? {
        Some(rendered) => {
            println!("{}", serde_json::to_string_pretty(&rendered)?);
            Ok(())
        }
        None => bail!("No content for {}", path),
    }
}
