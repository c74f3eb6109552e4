//! Route resolution.

use anyhow::{Context, Result};
use folio_core::Engine;
use folio_types::RouteMatch;
use serde_json::json;
use std::path::Path;

pub fn route(root: &Path, path: &str, json: bool) -> Result<()> {
    let mut engine = Engine::open(root).context("Failed to load site configuration")?;
    engine.ensure_fresh().context("Failed to refresh index")?;

    let matched = engine.repository().route_for(path)?;
    let value = match &matched {
        None => json!({ "kind": "none" }),
        Some(RouteMatch::Redirect(r)) => json!({ "kind": "redirect", "to": r.to, "status": r.status }),
        Some(RouteMatch::Content(c)) => json!({
            "kind": "content",
            "type": c.content_type,
            "slug": c.slug,
            "template": c.template,
        }),
        Some(RouteMatch::Archive(a)) => json!({
            "kind": "archive",
            "type": a.content_type,
            "template": a.template,
        }),
        Some(RouteMatch::Taxonomy {
            taxonomy,
            term,
            hierarchical,
        }) => json!({
            "kind": "taxonomy",
            "taxonomy": taxonomy,
            "term": term,
            "hierarchical": hierarchical,
        }),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match matched {
        None => println!("No route for {}", path),
        Some(RouteMatch::Redirect(r)) => println!("redirect {} -> {}", r.status, r.to),
        Some(RouteMatch::Content(c)) => println!("content {}/{}", c.content_type, c.slug),
        Some(RouteMatch::Archive(a)) => println!("archive {}", a.content_type),
        Some(RouteMatch::Taxonomy { taxonomy, term, .. }) => match term {
            Some(term) => println!("taxonomy {} term {}", taxonomy, term),
            None => println!("taxonomy {}", taxonomy),
        },
    }
    Ok(())
}
