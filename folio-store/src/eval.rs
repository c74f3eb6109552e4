//! In-process filtering, ordering and pagination over indexed items.
//!
//! Semantics follow SQL so the relational backend can push the same
//! predicates into queries: comparisons against a missing (null) value are
//! false for every operator, numbers order before text, and items missing
//! the sort key sort last in either direction.

use crate::scoring;
use folio_types::{
    Direction, FieldFilter, FieldValue, IndexedItem, Operator, QueryParams, QueryResult, SortSpec,
};
use regex::RegexBuilder;
use std::cmp::Ordering;

/// Does `item` satisfy the status, taxonomy and field filters of `params`?
pub fn matches(item: &IndexedItem, params: &QueryParams) -> bool {
    if let Some(content_type) = &params.content_type {
        if &item.content_type != content_type {
            return false;
        }
    }
    if let Some(status) = &params.status {
        if item.status.as_str() != status {
            return false;
        }
    }
    if !params
        .taxonomies
        .iter()
        .all(|(taxonomy, term)| item.has_term(taxonomy, term))
    {
        return false;
    }
    params.filters.iter().all(|f| matches_filter(item, f))
}

pub fn matches_filter(item: &IndexedItem, filter: &FieldFilter) -> bool {
    let actual = item.field(&filter.field);
    if actual.is_null() {
        return match filter.op {
            // `x NOT IN ()` holds for any x
            Operator::NotIn => list_values(&filter.value).is_empty(),
            _ => false,
        };
    }

    let cmp = |expected: &FieldValue| actual.compare(expected);
    match &filter.op {
        Operator::Eq => cmp(&filter.value) == Some(Ordering::Equal),
        Operator::Ne => matches!(cmp(&filter.value), Some(o) if o != Ordering::Equal),
        Operator::Gt => cmp(&filter.value) == Some(Ordering::Greater),
        Operator::Gte => matches!(cmp(&filter.value), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => cmp(&filter.value) == Some(Ordering::Less),
        Operator::Lte => matches!(cmp(&filter.value), Some(Ordering::Less | Ordering::Equal)),
        Operator::In => list_values(&filter.value)
            .iter()
            .any(|v| cmp(v) == Some(Ordering::Equal)),
        Operator::NotIn => {
            let values = list_values(&filter.value);
            values.iter().all(|v| matches!(cmp(v), Some(o) if o != Ordering::Equal))
        }
        Operator::Like => match (actual.to_text(), filter.value.to_text()) {
            (Some(text), Some(pattern)) => like_match(&text, &pattern),
            _ => false,
        },
        Operator::Unknown(op) => {
            tracing::debug!("Unknown filter operator '{}' matches nothing", op);
            false
        }
    }
}

/// Operand list for `in` / `not_in`; a scalar acts as a one-element list.
pub fn list_values(value: &FieldValue) -> Vec<FieldValue> {
    match value {
        FieldValue::List(items) => items.clone(),
        FieldValue::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// SQL `LIKE`: `%` matches any run, `_` one character, ASCII case-insensitive.
/// Non-ASCII letters must match exactly, as in SQLite.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.to_ascii_lowercase().chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');

    match RegexBuilder::new(&re).dot_matches_new_line(true).build() {
        Ok(re) => re.is_match(&text.to_ascii_lowercase()),
        Err(err) => {
            tracing::warn!("Invalid like pattern '{}': {}", pattern, err);
            false
        }
    }
}

/// Order two items by `sort`, nulls last, then `title`, `slug` and `type`
/// ascending so the result is deterministic.
pub fn compare_items(a: &IndexedItem, b: &IndexedItem, sort: &SortSpec) -> Ordering {
    let (left, right) = (a.field(&sort.field), b.field(&sort.field));
    let primary = match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = left.compare(&right).unwrap_or(Ordering::Equal);
            match sort.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }
    };

    primary
        .then_with(|| a.title.as_bytes().cmp(b.title.as_bytes()))
        .then_with(|| a.slug.as_bytes().cmp(b.slug.as_bytes()))
        .then_with(|| a.content_type.as_bytes().cmp(b.content_type.as_bytes()))
}

pub fn sort_items(items: &mut [IndexedItem], sort: &SortSpec) {
    items.sort_by(|a, b| compare_items(a, b, sort));
}

/// Slice out the requested page.
pub fn paginate(items: Vec<IndexedItem>, params: &QueryParams) -> QueryResult {
    let total = items.len();
    let items = items
        .into_iter()
        .skip(params.offset())
        .take(params.per_page)
        .collect();
    QueryResult { items, total }
}

/// Full in-process evaluation: filter, then rank by relevance when a search
/// term is present (candidates pre-ordered by the configured sort so equal
/// scores keep that order), otherwise sort; then paginate.
pub fn execute(candidates: impl IntoIterator<Item = IndexedItem>, params: &QueryParams) -> QueryResult {
    let mut items: Vec<IndexedItem> = candidates
        .into_iter()
        .filter(|item| matches(item, params))
        .collect();
    sort_items(&mut items, &params.sort);

    if let Some(search) = params.active_search() {
        items = scoring::rank(items, search);
    }

    paginate(items, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::Status;
    use std::collections::BTreeMap;

    fn item(slug: &str, title: &str, date: Option<&str>) -> IndexedItem {
        IndexedItem {
            content_type: "post".into(),
            slug: slug.into(),
            id: None,
            title: title.into(),
            status: Status::Published,
            date: date.map(String::from),
            updated: None,
            excerpt: None,
            template: None,
            file_path: String::new(),
            relative_path: format!("posts/{slug}.md"),
            url: format!("/{slug}"),
            taxonomies: BTreeMap::new(),
            fields: BTreeMap::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_sort_nulls_last_and_title_tiebreak() {
        let mut items = vec![
            item("c", "Charlie", None),
            item("b", "Bravo", Some("2024-01-01")),
            item("a", "Alpha", Some("2024-01-01")),
            item("d", "Delta", Some("2024-02-01")),
        ];
        sort_items(&mut items, &SortSpec::default());
        let slugs: Vec<_> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["d", "a", "b", "c"]);

        sort_items(&mut items, &SortSpec::new("date", Direction::Asc));
        let slugs: Vec<_> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_field_operators() {
        let mut it = item("a", "Alpha", Some("2024-01-01"));
        it.fields.insert("rating".into(), FieldValue::Int(4));
        it.fields.insert("lang".into(), FieldValue::text("rust"));

        assert!(matches_filter(&it, &FieldFilter::new("rating", ">=", 4i64)));
        assert!(!matches_filter(&it, &FieldFilter::new("rating", ">", 4i64)));
        assert!(matches_filter(&it, &FieldFilter::new("rating", "!=", 3i64)));
        assert!(matches_filter(
            &it,
            &FieldFilter::new("lang", "in", vec!["go", "rust"])
        ));
        assert!(matches_filter(
            &it,
            &FieldFilter::new("lang", "not_in", vec!["go"])
        ));
        assert!(matches_filter(&it, &FieldFilter::new("title", "like", "al%")));
        assert!(matches_filter(&it, &FieldFilter::new("date", "<", "2024-06-01")));
    }

    #[test]
    fn test_null_and_unknown_operators_fail_closed() {
        let it = item("a", "Alpha", None);
        assert!(!matches_filter(&it, &FieldFilter::new("date", "!=", "x")));
        assert!(!matches_filter(&it, &FieldFilter::new("missing", "=", "x")));
        assert!(!matches_filter(&it, &FieldFilter::new("title", "~=", "Alpha")));
    }

    #[test]
    fn test_like_escapes_regex_metacharacters() {
        assert!(like_match("a.b", "a.b"));
        assert!(!like_match("axb", "a.b"));
        assert!(like_match("Hello World", "hello_world"));
        assert!(like_match("multi\nline", "multi%"));
    }

    #[test]
    fn test_like_folds_ascii_case_only() {
        assert!(like_match("RUST Notes", "rust%"));
        assert!(like_match("Über", "Über"));
        assert!(!like_match("Über", "über"));
    }

    #[test]
    fn test_execute_paginates_after_filtering() {
        let items: Vec<_> = (1..=5)
            .map(|n| item(&format!("p{n}"), &format!("P{n}"), Some(&format!("2024-01-0{n}"))))
            .collect();
        let params = QueryParams {
            page: 2,
            per_page: 2,
            ..QueryParams::default()
        };
        let result = execute(items, &params);
        assert_eq!(result.total, 5);
        let slugs: Vec<_> = result.items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["p3", "p2"]);
    }
}
