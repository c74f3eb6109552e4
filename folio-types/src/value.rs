//! Frontmatter values and publication status.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A frontmatter value as stored in the index.
///
/// The derived (externally tagged) representation survives both the bincode
/// and the JSON snapshot serializers. Use [`FieldValue::to_json`] when a plain
/// JSON document is needed, e.g. for the relational backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

/// Storage class ordering used for mixed-type comparisons:
/// numbers sort before text, text before structured values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Class {
    Numeric,
    Text,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness for flags such as `featured: true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::Text(s) => {
                let s = s.trim();
                !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false")
            }
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Map(map) => !map.is_empty(),
        }
    }

    /// Text rendering used by search and `like` matching.
    ///
    /// Returns `None` for null. Lists and maps render as compact JSON.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(float_text(*f)),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::List(_) | FieldValue::Map(_) => Some(self.to_json().to_string()),
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn class(&self) -> Option<Class> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(_) | FieldValue::Int(_) | FieldValue::Float(_) => Some(Class::Numeric),
            FieldValue::Text(_) | FieldValue::List(_) | FieldValue::Map(_) => Some(Class::Text),
        }
    }

    /// Total-ish ordering with SQL semantics: `None` when either side is null,
    /// numbers compare numerically, text compares bytewise, and any number
    /// sorts before any text.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        let (left, right) = (self.class()?, other.class()?);
        if left != right {
            return Some(left.cmp(&right));
        }
        match left {
            Class::Numeric => {
                let (a, b) = (self.numeric()?, other.numeric()?);
                Some(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
            }
            Class::Text => {
                let (a, b) = (self.to_text()?, other.to_text()?);
                Some(a.as_bytes().cmp(b.as_bytes()))
            }
        }
    }

    /// Convert to a plain JSON value (no enum tagging).
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Build from a plain JSON value.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(items) => FieldValue::List(items.iter().map(FieldValue::from_json).collect()),
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Publication status of a content item.
///
/// Values outside the known set are preserved in `Other` so validation can
/// report them; such items behave like drafts for visibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Draft,
    Published,
    Private,
    Unlisted,
    Other(String),
}

impl Status {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "draft" => Status::Draft,
            "published" => Status::Published,
            "private" => Status::Private,
            "unlisted" => Status::Unlisted,
            _ => Status::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
            Status::Private => "private",
            Status::Unlisted => "unlisted",
            Status::Other(s) => s,
        }
    }

    pub fn is_published(&self) -> bool {
        *self == Status::Published
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Status::Other(_))
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::parse(&value)
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a float the way SQLite casts a REAL to TEXT: integral values keep
/// a trailing `.0`.
fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}
