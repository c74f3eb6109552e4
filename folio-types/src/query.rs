//! Backend query parameters, results and pagination.

use crate::item::IndexedItem;
use crate::search::SearchSpec;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: usize = 10;
pub const MAX_PER_PAGE: usize = 100;

/// Clamp a requested page size to `[1, MAX_PER_PAGE]`.
pub fn clamp_per_page(requested: i64) -> usize {
    requested.clamp(1, MAX_PER_PAGE as i64) as usize
}

/// Clamp a requested page number to at least 1.
pub fn clamp_page(requested: i64) -> usize {
    requested.max(1) as usize
}

/// Items skipped before `page`. Saturates, so an absurd page is simply empty.
pub fn page_offset(page: usize, per_page: usize) -> usize {
    (page.max(1) - 1).saturating_mul(per_page)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            Direction::Asc
        } else {
            Direction::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn is_date_desc(&self) -> bool {
        self.field == "date" && self.direction == Direction::Desc
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new("date", Direction::Desc)
    }
}

/// Field filter operator. Unknown operators are kept and match nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    Unknown(String),
}

impl Operator {
    pub fn parse(op: &str) -> Self {
        match op.trim().to_lowercase().as_str() {
            "=" | "==" | "eq" => Operator::Eq,
            "!=" | "<>" | "ne" => Operator::Ne,
            ">" | "gt" => Operator::Gt,
            ">=" | "gte" => Operator::Gte,
            "<" | "lt" => Operator::Lt,
            "<=" | "lte" => Operator::Lte,
            "in" => Operator::In,
            "not_in" | "not in" => Operator::NotIn,
            "like" => Operator::Like,
            other => Operator::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: Operator,
    pub value: FieldValue,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            op: Operator::parse(op),
            value: value.into(),
        }
    }
}

/// Everything a backend needs to answer a full-index query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub content_type: Option<String>,
    /// `None` means any status
    pub status: Option<String>,
    /// `(taxonomy, term slug)` pairs, ANDed
    pub taxonomies: Vec<(String, String)>,
    pub filters: Vec<FieldFilter>,
    pub search: Option<SearchSpec>,
    pub sort: SortSpec,
    pub page: usize,
    pub per_page: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            content_type: None,
            status: None,
            taxonomies: Vec::new(),
            filters: Vec::new(),
            search: None,
            sort: SortSpec::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl QueryParams {
    pub fn offset(&self) -> usize {
        page_offset(self.page, self.per_page)
    }

    /// The search spec when it carries a non-blank term.
    pub fn active_search(&self) -> Option<&SearchSpec> {
        self.search.as_ref().filter(|s| !s.is_blank())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub items: Vec<IndexedItem>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(per_page);
        Self {
            current_page: page,
            per_page,
            total,
            total_pages,
            has_more: page < total_pages,
            has_previous: page > 1,
        }
    }
}
