//! Frontmatter splitting and YAML decoding.

use folio_types::FieldValue;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Frontmatter opened on line 1 is never closed")]
    Unterminated,

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Frontmatter is not a map")]
    NotAMap,
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Split `content` into its raw frontmatter block (if any) and body.
///
/// A file whose first line is `---` must close the block with another `---`
/// line; otherwise the whole file is body.
pub fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(first_end) = content.find('\n') else {
        return if is_delimiter(content) {
            Err(FrontmatterError::Unterminated)
        } else {
            Ok((None, content))
        };
    };
    if !is_delimiter(&content[..first_end]) {
        return Ok((None, content));
    }

    let yaml_start = first_end + 1;
    let mut offset = yaml_start;
    for line in content[yaml_start..].split_inclusive('\n') {
        if is_delimiter(line.trim_end_matches(['\r', '\n'])) {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unterminated)
}

/// Parse frontmatter from markdown content
///
/// Returns the frontmatter map (empty when the file has none) and the body.
///
/// ```
/// use folio_core::frontmatter::parse_frontmatter;
///
/// let (fm, body) = parse_frontmatter("---\ntitle: Hello\n---\nBody\n").unwrap();
/// assert_eq!(fm.get("title").and_then(|v| v.as_str()), Some("Hello"));
/// assert_eq!(body, "Body\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Mapping, String), FrontmatterError> {
    let (yaml, body) = split_frontmatter(content)?;
    let map = match yaml {
        None => Mapping::new(),
        Some(yaml) => match serde_yaml::from_str::<Value>(yaml)? {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            _ => return Err(FrontmatterError::NotAMap),
        },
    };
    Ok((map, body.to_string()))
}

/// Convert a YAML value into an index field value.
pub fn yaml_to_field(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else {
                n.as_f64().map(FieldValue::Float).unwrap_or_default()
            }
        }
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Sequence(items) => FieldValue::List(items.iter().map(yaml_to_field).collect()),
        Value::Mapping(map) => FieldValue::Map(
            map.iter()
                .filter_map(|(k, v)| Some((yaml_key(k)?, yaml_to_field(v))))
                .collect::<BTreeMap<_, _>>(),
        ),
        Value::Tagged(tagged) => yaml_to_field(&tagged.value),
    }
}

/// String form of a mapping key; non-scalar keys are skipped.
pub fn yaml_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scalar value as a string (numbers and booleans stringified).
pub fn yaml_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => yaml_scalar(&tagged.value),
        _ => None,
    }
}

/// A scalar or a list of scalars, as strings.
pub fn yaml_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(yaml_scalar).collect(),
        other => yaml_scalar(other).into_iter().collect(),
    }
}
