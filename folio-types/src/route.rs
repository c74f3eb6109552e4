//! Route table built at index time and path resolution against it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub to: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactRoute {
    pub content_type: String,
    pub slug: String,
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRoute {
    pub content_type: String,
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRoute {
    pub base: String,
    pub hierarchical: bool,
    /// Joins hierarchical term segments in URLs
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    "/".to_string()
}

/// Route classes keyed by normalized path (taxonomy routes keyed by name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub redirects: BTreeMap<String, Redirect>,
    pub exact: BTreeMap<String, ExactRoute>,
    pub archives: BTreeMap<String, ArchiveRoute>,
    pub taxonomy: BTreeMap<String, TaxonomyRoute>,
}

/// Result of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Redirect(Redirect),
    Content(ExactRoute),
    Archive(ArchiveRoute),
    Taxonomy {
        taxonomy: String,
        /// Remaining path after the base; `None` for the taxonomy index itself
        term: Option<String>,
        hierarchical: bool,
    },
}

/// Normalize a URL path: leading slash, no trailing slash (except root),
/// no duplicate slashes.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

impl RouteTable {
    /// Resolve a path: redirects, then exact content routes, then archives,
    /// then the first taxonomy whose base is a prefix of the path.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);

        if let Some(redirect) = self.redirects.get(&path) {
            return Some(RouteMatch::Redirect(redirect.clone()));
        }
        if let Some(exact) = self.exact.get(&path) {
            return Some(RouteMatch::Content(exact.clone()));
        }
        if let Some(archive) = self.archives.get(&path) {
            return Some(RouteMatch::Archive(archive.clone()));
        }

        for (name, route) in &self.taxonomy {
            let base = normalize_path(&route.base);
            let term = if path == base {
                None
            } else if base == "/" {
                Some(path.trim_start_matches('/').to_string())
            } else if let Some(rest) = path.strip_prefix(&format!("{base}/")) {
                Some(rest.to_string())
            } else {
                continue;
            };

            let nested_path = route.hierarchical && route.separator == "/";
            let term = match term {
                Some(t) if t.contains('/') && !nested_path => continue,
                Some(t) if route.hierarchical && !nested_path => {
                    Some(t.split(route.separator.as_str()).collect::<Vec<_>>().join("/"))
                }
                other => other,
            };

            return Some(RouteMatch::Taxonomy {
                taxonomy: name.clone(),
                term,
                hierarchical: route.hierarchical,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        let mut table = RouteTable::default();
        table.redirects.insert(
            "/x".into(),
            Redirect {
                to: "/new-x".into(),
                status: 301,
            },
        );
        table.exact.insert(
            "/x".into(),
            ExactRoute {
                content_type: "page".into(),
                slug: "x".into(),
                template: None,
            },
        );
        table.exact.insert(
            "/about".into(),
            ExactRoute {
                content_type: "page".into(),
                slug: "about".into(),
                template: Some("page.html".into()),
            },
        );
        table.archives.insert(
            "/blog".into(),
            ArchiveRoute {
                content_type: "post".into(),
                template: None,
            },
        );
        table.taxonomy.insert(
            "category".into(),
            TaxonomyRoute {
                base: "/category".into(),
                hierarchical: true,
                separator: "/".into(),
            },
        );
        table.taxonomy.insert(
            "tag".into(),
            TaxonomyRoute {
                base: "/tag".into(),
                hierarchical: false,
                separator: "/".into(),
            },
        );
        table
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("about/"), "/about");
        assert_eq!(normalize_path("//a//b/"), "/a/b");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_redirect_wins_over_exact() {
        let table = table();
        assert!(matches!(table.resolve("/x"), Some(RouteMatch::Redirect(r)) if r.to == "/new-x"));
        assert!(matches!(table.resolve("/about/"), Some(RouteMatch::Content(r)) if r.slug == "about"));
        assert!(matches!(table.resolve("/blog"), Some(RouteMatch::Archive(_))));
    }

    #[test]
    fn test_taxonomy_prefix() {
        let mut table = table();
        assert_eq!(
            table.resolve("/category/lang/rust"),
            Some(RouteMatch::Taxonomy {
                taxonomy: "category".into(),
                term: Some("lang/rust".into()),
                hierarchical: true,
            })
        );
        assert_eq!(
            table.resolve("/tag"),
            Some(RouteMatch::Taxonomy {
                taxonomy: "tag".into(),
                term: None,
                hierarchical: false,
            })
        );
        assert_eq!(table.resolve("/tag/a/b"), None);

        table.taxonomy.insert(
            "topic".into(),
            TaxonomyRoute {
                base: "/topic".into(),
                hierarchical: true,
                separator: ":".into(),
            },
        );
        assert_eq!(
            table.resolve("/topic/lang:rust"),
            Some(RouteMatch::Taxonomy {
                taxonomy: "topic".into(),
                term: Some("lang/rust".into()),
                hierarchical: true,
            })
        );
        assert_eq!(table.resolve("/topic/lang/rust"), None);
        assert_eq!(table.resolve("/tagged"), None);
        assert_eq!(table.resolve("/nowhere"), None);
    }
}
