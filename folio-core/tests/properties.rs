//! End-to-end behaviour of the indexer, repository and query layers over
//! real site directories.

use folio_core::backends;
use folio_core::parser::{normalize_date, parse};
use folio_core::{BackendKind, Config, DiagnosticKind, Indexer, Repository};
use folio_store::{scoring, ArrayBackend};
use folio_types::{
    Direction, FieldFilter, IndexedItem, ItemKey, QueryParams, RouteMatch, SearchSpec, SortSpec,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const CONTENT_TYPES: &str = "\
post:
  content_dir: posts
  url:
    type: pattern
    pattern: /blog/{slug}
    archive: /blog
  taxonomies: [tags, category]
  cache_fields: [featured]
page:
  content_dir: pages
";

const TAXONOMIES: &str = "\
tags: {}
category:
  hierarchical: true
  behaviour:
    hierarchy_rollup: true
";

struct Site {
    dir: tempfile::TempDir,
}

impl Site {
    fn new(site_yml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("config/terms")).unwrap();
        fs::write(root.join("config/site.yml"), site_yml).unwrap();
        fs::write(root.join("config/content_types.yml"), CONTENT_TYPES).unwrap();
        fs::write(root.join("config/taxonomies.yml"), TAXONOMIES).unwrap();
        fs::create_dir_all(root.join("content/posts")).unwrap();
        fs::create_dir_all(root.join("content/pages")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join("content").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn post(&self, slug: &str, frontmatter: &str) {
        self.write(
            &format!("posts/{slug}.md"),
            &format!("---\n{frontmatter}\n---\nBody of {slug}.\n"),
        );
    }

    fn config(&self) -> Arc<Config> {
        Arc::new(Config::load(self.root()).unwrap())
    }
}

/// Twelve published posts (eleven dated, some sharing a date, one undated)
/// plus a draft and a private post.
fn blog(site_yml: &str) -> Site {
    let site = Site::new(site_yml);
    let dates = [
        "2024-01-05", "2024-01-05", "2024-02-10", "2024-03-01", "2024-03-01", "2024-03-01",
        "2024-04-20", "2024-05-02", "2024-06-30", "2024-07-07", "2024-08-08",
    ];
    for (i, date) in dates.iter().enumerate() {
        let tag = if i % 2 == 0 { "rust" } else { "go" };
        site.post(
            &format!("post-{i:02}"),
            &format!(
                "title: Post {}\nstatus: published\ndate: {date}\ntags: [{tag}]\ncategory: lang/{tag}\nrating: {}",
                (b'A' + (i as u8 % 5)) as char,
                i % 4
            ),
        );
    }
    site.post("undated", "title: Undated\nstatus: published\ntags: [rust]");
    site.post("draft", "title: Draft\ndate: 2024-09-09\ntags: [rust]");
    site.post("private", "title: Private\nstatus: private\ndate: 2024-09-10");
    site
}

fn slugs(items: &[IndexedItem]) -> Vec<String> {
    items.iter().map(|i| i.slug.clone()).collect()
}

#[test]
fn test_frontmatter_round_trip() {
    let source = "---\ntitle: \"Colons: and quotes\"\nslug: round-trip\nstatus: published\ndate: 2024-03-09T10:15:00Z\n---\nBody\n";
    let record = parse(source.as_bytes(), Path::new("posts/x.md"), "posts/x.md", "post").unwrap();

    assert_eq!(record.title, "Colons: and quotes");
    assert_eq!(record.slug, "round-trip");
    assert_eq!(record.status.as_str(), "published");

    let date = record.date.clone().unwrap();
    assert_eq!(normalize_date(&date).as_deref(), Some(date.as_str()));
    assert!(date.starts_with("2024-03-09T10:15:00"));

    let rewritten = format!(
        "---\ntitle: \"{}\"\nslug: {}\nstatus: {}\ndate: {}\n---\n{}",
        record.title,
        record.slug,
        record.status.as_str(),
        date,
        record.body
    );
    let again = parse(rewritten.as_bytes(), Path::new("posts/x.md"), "posts/x.md", "post").unwrap();
    assert_eq!(
        (again.title, again.slug, again.status, again.date, again.body),
        (record.title, record.slug, record.status, record.date, record.body)
    );

    let padded = "---\ntitle: \"  Hello  \"\n---\n";
    let record = parse(padded.as_bytes(), Path::new("posts/x.md"), "posts/x.md", "post").unwrap();
    assert_eq!(record.title, "  Hello  ");
}

#[test]
fn test_rebuild_is_idempotent() {
    let site = blog("");
    let config = site.config();
    let indexer = Indexer::new(config.clone());
    let snapshots = ArrayBackend::new(config.index_dir(), backends::codec(&config)).snapshot_paths();

    indexer.rebuild().unwrap();
    let first: Vec<Vec<u8>> = snapshots.iter().map(|p| fs::read(p).unwrap()).collect();
    indexer.rebuild().unwrap();
    let second: Vec<Vec<u8>> = snapshots.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn test_fingerprint_tracks_changes() {
    let site = blog("");
    let indexer = Indexer::new(site.config());
    assert!(!indexer.is_cache_fresh());

    indexer.rebuild().unwrap();
    assert!(indexer.is_cache_fresh());

    site.post("new", "title: New");
    assert!(!indexer.is_cache_fresh());

    indexer.rebuild().unwrap();
    assert!(indexer.is_cache_fresh());
    fs::write(site.root().join("config/site.yml"), "recent_cache_size: 50\n").unwrap();
    assert!(!indexer.is_cache_fresh());
}

#[test]
fn test_duplicate_slug_keeps_first() {
    let site = Site::new("");
    site.post("a", "title: First\nslug: same");
    site.post("b", "title: Second\nslug: same");
    let (bundle, report) = Indexer::new(site.config()).build().unwrap();

    let kept = bundle.content.get(&ItemKey::new("post", "same")).unwrap();
    assert_eq!(kept.title, "First");
    assert_eq!(report.items, 1);

    let dupes: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| matches!(d.kind, DiagnosticKind::DuplicateSlug { .. }))
        .collect();
    assert_eq!(dupes.len(), 1);
    let message = dupes[0].to_string();
    assert!(message.contains("a.md") && message.contains("b.md"), "{message}");
}

#[test]
fn test_pagination_bounds() {
    let site = blog("");
    let config = site.config();
    Indexer::new(config.clone()).rebuild().unwrap();
    let repo = Repository::new(config);
    let base = repo.query().type_("post");

    let per_page: Vec<usize> = [0, 1, 100, 999]
        .iter()
        .map(|&n| base.per_page(n).params().per_page)
        .collect();
    assert_eq!(per_page, vec![1, 1, 100, 100]);

    let pages: Vec<usize> = [-5, 0, 1].iter().map(|&n| base.page(n).params().page).collect();
    assert_eq!(pages, vec![1, 1, 1]);

    let p = base.per_page(5).page(3).pagination().unwrap();
    assert_eq!(p.total, 12);
    assert_eq!(p.total_pages, 3);
    assert!(!p.has_more);
    assert!(p.has_previous);
}

fn assert_far_page_is_empty(repo: &Repository) {
    let far = repo.query().type_("post").per_page(100).page(i64::MAX);
    assert!(far.used_fast_path().unwrap());
    assert!(far.raw().unwrap().is_empty());
    assert_eq!(far.count().unwrap(), 12);
    assert!(!far.pagination().unwrap().has_more);

    let filtered = far.where_tax("tags", "rust");
    assert!(!filtered.used_fast_path().unwrap());
    assert!(filtered.is_empty().unwrap());
    assert_eq!(filtered.count().unwrap(), 7);

    let searched = far.search("post");
    assert!(searched.is_empty().unwrap());
}

#[test]
fn test_far_page_is_empty() {
    let site = blog("");
    let config = site.config();
    Indexer::new(config.clone()).rebuild().unwrap();
    assert_far_page_is_empty(&Repository::new(config));
}

#[cfg(feature = "sqlite")]
#[test]
fn test_far_page_is_empty_sqlite() {
    let site = blog("backend: sqlite\n");
    let config = site.config();
    Indexer::new(config.clone()).rebuild().unwrap();
    let repo = Repository::new(config);
    assert_eq!(repo.backend().kind(), BackendKind::Sqlite);
    assert_far_page_is_empty(&repo);
}

fn assert_fast_path_matches_full(repo: &Repository) {
    let backend = repo.backend();
    for per_page in [1, 3, 5] {
        for page in 1..=4 {
            let q = repo.query().type_("post").per_page(per_page).page(page);
            let full = backend.query(&q.params()).unwrap();
            assert_eq!(
                slugs(q.raw().unwrap()),
                slugs(&full.items),
                "per_page {per_page} page {page}"
            );
            assert_eq!(q.count().unwrap(), full.total);
        }
    }
}

#[test]
fn test_fast_path_matches_full_index() {
    let site = blog("recent_cache_size: 6\n");
    let config = site.config();
    Indexer::new(config.clone()).rebuild().unwrap();
    let repo = Repository::new(config);

    let first = repo.query().type_("post").per_page(3).page(2);
    assert!(first.used_fast_path().unwrap());
    let beyond = repo.query().type_("post").per_page(3).page(3);
    assert!(!beyond.used_fast_path().unwrap());

    assert_fast_path_matches_full(&repo);
}

#[cfg(feature = "sqlite")]
#[test]
fn test_fast_path_matches_full_index_sqlite() {
    let site = blog("backend: sqlite\nrecent_cache_size: 6\n");
    let config = site.config();
    Indexer::new(config.clone()).rebuild().unwrap();
    let repo = Repository::new(config);
    assert_eq!(repo.backend().kind(), BackendKind::Sqlite);

    assert!(repo.query().type_("post").per_page(2).used_fast_path().unwrap());
    assert_fast_path_matches_full(&repo);
}

#[test]
fn test_search_scoring_example() {
    let site = Site::new("");
    site.post("a", "title: Getting Started with PHP\nstatus: published");
    site.post("b", "title: PHP Tips\nstatus: published");
    site.post("c", "title: Unrelated\nstatus: published");
    let config = site.config();
    let (bundle, _) = Indexer::new(config.clone()).build().unwrap();
    Indexer::new(config.clone()).rebuild().unwrap();

    let spec = SearchSpec::new("php");
    for slug in ["a", "b"] {
        let item = bundle.content.get(&ItemKey::new("post", slug)).unwrap();
        assert!(scoring::score(item, &spec) >= 10, "{slug}");
    }
    let c = bundle.content.get(&ItemKey::new("post", "c")).unwrap();
    assert_eq!(scoring::score(c, &spec), 0);

    let repo = Repository::new(config);
    let found = repo.query().type_("post").search("php");
    let mut hits = slugs(found.raw().unwrap());
    assert_eq!(found.count().unwrap(), 2);
    hits.sort();
    assert_eq!(hits, vec!["a", "b"]);
}

#[test]
fn test_search_skips_types_with_search_disabled() {
    let site = Site::new("");
    fs::write(
        site.root().join("config/content_types.yml"),
        format!("{CONTENT_TYPES}  search:\n    enabled: false\n"),
    )
    .unwrap();
    site.post("notes", "title: Rust Notes\nstatus: published");
    site.write("pages/about.md", "---\ntitle: Rust Page\nstatus: published\n---\nAll about rust.\n");
    let config = site.config();
    let (bundle, _) = Indexer::new(config.clone()).build().unwrap();
    Indexer::new(config.clone()).rebuild().unwrap();

    let page = bundle.content.get(&ItemKey::new("page", "about")).unwrap();
    assert!(page.body.is_empty());
    let post = bundle.content.get(&ItemKey::new("post", "notes")).unwrap();
    assert!(!post.body.is_empty());

    let repo = Repository::new(config);
    let everywhere = repo.query().search("rust");
    assert_eq!(slugs(everywhere.raw().unwrap()), vec!["notes"]);
    assert_eq!(everywhere.count().unwrap(), 1);
    assert!(repo.query().type_("page").search("rust").is_empty().unwrap());
    assert_eq!(repo.query().type_("page").count().unwrap(), 1);
}

#[test]
fn test_term_counts_match_items() {
    let site = blog("");
    fs::write(
        site.root().join("config/terms/tags.yml"),
        "- slug: rust\n  name: Rust\n  description: Systems language\n  color: orange\n- slug: zig\n  name: Zig\n",
    )
    .unwrap();
    let config = site.config();
    let (bundle, _) = Indexer::new(config).build().unwrap();

    for terms in bundle.taxonomies.values() {
        for term in terms.values() {
            assert_eq!(term.count, term.items.len(), "{}", term.slug);
        }
    }

    let tags = &bundle.taxonomies["tags"];
    assert_eq!(tags["rust"].name, "Rust");
    assert_eq!(tags["rust"].description.as_deref(), Some("Systems language"));
    assert_eq!(tags["rust"].count, 7);
    assert_eq!(tags["zig"].count, 0);

    let category = &bundle.taxonomies["category"];
    assert_eq!(category["lang"].count, 12 - 1);
    assert_eq!(category["lang/go"].parent.as_deref(), Some("lang"));
}

#[test]
fn test_redirect_beats_exact_route() {
    let site = Site::new("");
    site.post("b", "title: B\nstatus: published");
    site.post("a", "title: A\nstatus: published\nredirect_from: [/blog/b, /a-old]");
    let config = site.config();
    Indexer::new(config.clone()).rebuild().unwrap();
    let repo = Repository::new(config);

    assert!(matches!(
        repo.route_for("/blog/b").unwrap(),
        Some(RouteMatch::Redirect(r)) if r.to == "/blog/a"
    ));
    assert!(matches!(
        repo.route_for("/blog/a").unwrap(),
        Some(RouteMatch::Content(r)) if r.slug == "a"
    ));
}

#[test]
fn test_unknown_terms_are_dropped_when_disallowed() {
    let site = Site::new("");
    fs::write(
        site.root().join("config/taxonomies.yml"),
        "tags:\n  behaviour:\n    allow_unknown_terms: false\ncategory: {}\n",
    )
    .unwrap();
    fs::write(site.root().join("config/terms/tags.yml"), "- slug: rust\n  name: Rust\n").unwrap();
    site.post("a", "title: A\nstatus: published\ntags: [rust, cobol]");
    let (bundle, report) = Indexer::new(site.config()).build().unwrap();

    let item = bundle.content.get(&ItemKey::new("post", "a")).unwrap();
    assert_eq!(item.taxonomies["tags"], vec!["rust".to_string()]);
    assert!(!bundle.taxonomies["tags"].contains_key("cobol"));
    assert!(report.diagnostics.iter().any(|d| matches!(
        &d.kind,
        DiagnosticKind::UnknownTerm { term, .. } if term == "cobol"
    )));
}

fn post(f: impl FnOnce(&mut QueryParams)) -> QueryParams {
    let mut params = QueryParams {
        content_type: Some("post".into()),
        status: Some("published".into()),
        per_page: 50,
        ..QueryParams::default()
    };
    f(&mut params);
    params
}

#[cfg(feature = "sqlite")]
#[test]
fn test_backend_parity() {
    let site = blog("");
    site.write("pages/about.md", "---\ntitle: About\nstatus: published\n---\nPHP and Rust\n");
    site.post("umlaut", "title: Über\nstatus: published\nrating: 4.0");
    // same id twice: the first file in walk order owns it
    site.post("dup-a", "title: Dup A\nslug: zzz\nid: X1\nstatus: published");
    site.post("dup-b", "title: Dup B\nslug: aaa\nid: X1\nstatus: published");
    let config = site.config();
    let (bundle, _) = Indexer::new(config.clone()).build().unwrap();

    let array = backends::open(&config, BackendKind::Array);
    let sqlite = backends::open(&config, BackendKind::Sqlite);
    array.write(&bundle).unwrap();
    sqlite.write(&bundle).unwrap();

    let cases = vec![
        post(|_| {}),
        post(|p| p.status = None),
        post(|p| p.sort = SortSpec::new("title", Direction::Asc)),
        post(|p| p.sort = SortSpec::new("rating", Direction::Desc)),
        post(|p| p.sort = SortSpec::new("missing", Direction::Asc)),
        post(|p| p.taxonomies = vec![("tags".into(), "rust".into())]),
        post(|p| p.taxonomies = vec![("category".into(), "lang".into())]),
        post(|p| p.filters = vec![FieldFilter::new("rating", ">=", 2i64)]),
        post(|p| p.filters = vec![FieldFilter::new("rating", "in", vec![0i64, 3])]),
        post(|p| p.filters = vec![FieldFilter::new("title", "like", "post a%")]),
        post(|p| p.filters = vec![FieldFilter::new("title", "like", "über")]),
        post(|p| p.filters = vec![FieldFilter::new("title", "like", "Über")]),
        post(|p| p.filters = vec![FieldFilter::new("rating", "like", "4.0")]),
        post(|p| p.filters = vec![FieldFilter::new("rating", "like", "4")]),
        post(|p| p.filters = vec![FieldFilter::new("date", "<", "2024-03-01")]),
        post(|p| p.filters = vec![FieldFilter::new("rating", "??", 1i64)]),
        post(|p| {
            p.per_page = 4;
            p.page = 3;
        }),
        post(|p| p.page = usize::MAX),
        post(|p| p.search = Some(SearchSpec::new("post body"))),
        post(|p| {
            p.content_type = None;
            p.search = Some(SearchSpec::new("rust"));
        }),
    ];

    for params in &cases {
        let a = array.query(params).unwrap();
        let s = sqlite.query(params).unwrap();
        assert_eq!(a.total, s.total, "{params:?}");
        assert_eq!(slugs(&a.items), slugs(&s.items), "{params:?}");
    }

    let owner = |b: &dyn folio_core::Backend| b.get_by_id("X1").unwrap().map(|i| i.slug);
    assert_eq!(owner(array.as_ref()), Some("zzz".to_string()));
    assert_eq!(owner(sqlite.as_ref()), Some("zzz".to_string()));

    let umlaut = post(|p| p.filters = vec![FieldFilter::new("title", "like", "über")]);
    assert_eq!(array.query(&umlaut).unwrap().total, 0);
    let float = post(|p| p.filters = vec![FieldFilter::new("rating", "like", "4.0")]);
    assert_eq!(slugs(&array.query(&float).unwrap().items), vec!["umlaut"]);

    assert_eq!(array.types().unwrap(), sqlite.types().unwrap());
    assert_eq!(array.terms("tags").unwrap(), sqlite.terms("tags").unwrap());
    assert_eq!(array.routes().unwrap(), sqlite.routes().unwrap());
    assert_eq!(
        array.count("post", Some("published")).unwrap(),
        sqlite.count("post", Some("published")).unwrap()
    );
}
