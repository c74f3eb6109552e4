//! Relevance scoring for free-text search.

use folio_types::{IndexedItem, SearchSpec, SearchWeights};
use std::collections::BTreeSet;

/// Prepared query: lowercased phrase plus per-token variant sets.
struct Prepared {
    phrase: String,
    tokens: Vec<BTreeSet<String>>,
}

impl Prepared {
    fn new(spec: &SearchSpec) -> Self {
        Self {
            phrase: spec.phrase(),
            tokens: spec.token_variants(),
        }
    }

    fn phrase_in(&self, haystack: &str) -> bool {
        !self.phrase.is_empty() && haystack.contains(&self.phrase)
    }

    fn token_hits(&self, haystack: &str) -> u32 {
        self.tokens
            .iter()
            .filter(|variants| variants.iter().any(|v| haystack.contains(v.as_str())))
            .count() as u32
    }
}

fn capped(hits: u32, per_hit: u32, cap: u32) -> u32 {
    (hits * per_hit).min(cap)
}

fn score_prepared(item: &IndexedItem, query: &Prepared, spec: &SearchSpec) -> u32 {
    if spec.excluded_types.contains(&item.content_type) {
        return 0;
    }
    let w: &SearchWeights = &spec.weights;
    let mut score = 0;

    let title = item.title.to_lowercase();
    if query.phrase_in(&title) {
        score += w.title_phrase;
    }
    let title_hits = query.token_hits(&title);
    score += capped(title_hits, w.title_token, w.title_token_cap);
    if query.tokens.len() > 1 && title_hits as usize == query.tokens.len() {
        score += w.title_all_tokens;
    }

    if let Some(excerpt) = &item.excerpt {
        let excerpt = excerpt.to_lowercase();
        if query.phrase_in(&excerpt) {
            score += w.excerpt_phrase;
        }
        score += capped(query.token_hits(&excerpt), w.excerpt_token, w.excerpt_token_cap);
    }

    if !item.body.is_empty() {
        let body = item.body.to_lowercase();
        if query.phrase_in(&body) {
            score += w.body_phrase;
        }
        score += capped(query.token_hits(&body), w.body_token, w.body_token_cap);
    }

    for field in &spec.fields {
        if let Some(text) = item.field(field).to_text() {
            score += query.token_hits(&text.to_lowercase()) * w.field_token;
        }
    }

    // The featured bonus only lifts items that already matched.
    if score > 0 && item.field("featured").is_truthy() {
        score += w.featured;
    }

    score
}

/// Relevance score of one item; zero means no match.
pub fn score(item: &IndexedItem, spec: &SearchSpec) -> u32 {
    score_prepared(item, &Prepared::new(spec), spec)
}

/// Drop non-matching items and order the rest by score descending.
/// The sort is stable: equal scores keep their incoming order.
pub fn rank(items: Vec<IndexedItem>, spec: &SearchSpec) -> Vec<IndexedItem> {
    let query = Prepared::new(spec);
    let mut scored: Vec<(u32, IndexedItem)> = items
        .into_iter()
        .filter_map(|item| {
            let s = score_prepared(&item, &query, spec);
            (s > 0).then_some((s, item))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{FieldValue, Status};
    use std::collections::BTreeMap;

    fn item(slug: &str, title: &str) -> IndexedItem {
        IndexedItem {
            content_type: "post".into(),
            slug: slug.into(),
            id: None,
            title: title.into(),
            status: Status::Published,
            date: None,
            updated: None,
            excerpt: None,
            template: None,
            file_path: String::new(),
            relative_path: String::new(),
            url: String::new(),
            taxonomies: BTreeMap::new(),
            fields: BTreeMap::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_php_example() {
        let a = item("a", "Getting Started with PHP");
        let b = item("b", "PHP Tips");
        let c = item("c", "Unrelated");
        let spec = SearchSpec::new("php");

        assert!(score(&a, &spec) >= 10);
        assert!(score(&b, &spec) >= 10);
        assert_eq!(score(&c, &spec), 0);

        let ranked = rank(vec![a, b, c], &spec);
        let slugs: Vec<_> = ranked.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b"]);
    }

    #[test]
    fn test_excluded_types_never_match() {
        let mut spec = SearchSpec::new("php");
        spec.excluded_types.insert("post".into());
        assert_eq!(score(&item("a", "PHP Tips"), &spec), 0);
        assert!(rank(vec![item("a", "PHP Tips")], &spec).is_empty());
    }

    #[test]
    fn test_title_contributions() {
        let spec = SearchSpec::new("rust async");
        // phrase 80 + two tokens 20 + all-tokens bonus 40
        assert_eq!(score(&item("x", "Rust Async in Practice"), &spec), 140);
        // tokens only, no phrase: 20 + 40
        assert_eq!(score(&item("y", "Async code in Rust"), &spec), 60);
        // single token: 10
        assert_eq!(score(&item("z", "Rust"), &spec), 10);
    }

    #[test]
    fn test_excerpt_body_and_caps() {
        let mut it = item("x", "Nothing here");
        it.excerpt = Some("all about tokio".into());
        it.body = "tokio tokio runtime".into();
        let spec = SearchSpec::new("tokio");
        // excerpt phrase 30 + token 3, body phrase 20 + token 2
        assert_eq!(score(&it, &spec), 55);
    }

    #[test]
    fn test_synonyms_count_as_hits() {
        let spec = SearchSpec::new("js");
        assert_eq!(score(&item("x", "Modern JavaScript"), &spec), 10);
    }

    #[test]
    fn test_extra_fields_and_featured() {
        let mut it = item("x", "Plain");
        it.fields.insert("author".into(), FieldValue::text("Ferris Crab"));
        it.fields.insert("featured".into(), FieldValue::Bool(true));
        let mut spec = SearchSpec::new("ferris");
        assert_eq!(score(&it, &spec), 0);

        spec.fields = vec!["author".into()];
        assert_eq!(score(&it, &spec), 5 + 15);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let items = vec![item("first", "Rust"), item("second", "Rust"), item("third", "Rust Rust")];
        let ranked = rank(items, &SearchSpec::new("rust"));
        let slugs: Vec<_> = ranked.iter().map(|i| i.slug.as_str()).collect();
        // "Rust Rust" contains the phrase too, so all three tie at 90
        assert_eq!(slugs, vec!["first", "second", "third"]);
    }
}
