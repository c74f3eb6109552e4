//! Relevance search configuration: weights, stop words and synonyms.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Score contributions for relevance ranking.
///
/// Every field defaults independently, so a partial weight map in the
/// content-type configuration only overrides what it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchWeights {
    pub title_phrase: u32,
    /// Bonus when every token hits the title (multi-token queries only)
    pub title_all_tokens: u32,
    pub title_token: u32,
    pub title_token_cap: u32,
    pub excerpt_phrase: u32,
    pub excerpt_token: u32,
    pub excerpt_token_cap: u32,
    pub body_phrase: u32,
    pub body_token: u32,
    pub body_token_cap: u32,
    /// Per-token hit in an extra searchable field (uncapped)
    pub field_token: u32,
    pub featured: u32,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            title_phrase: 80,
            title_all_tokens: 40,
            title_token: 10,
            title_token_cap: 30,
            excerpt_phrase: 30,
            excerpt_token: 3,
            excerpt_token_cap: 15,
            body_phrase: 20,
            body_token: 2,
            body_token_cap: 10,
            field_token: 5,
            featured: 15,
        }
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "into", "is",
    "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "with",
];

const SYNONYMS: &[(&str, &[&str])] = &[
    ("js", &["javascript"]),
    ("javascript", &["js"]),
    ("ts", &["typescript"]),
    ("typescript", &["ts"]),
    ("db", &["database"]),
    ("database", &["db"]),
    ("docs", &["documentation"]),
    ("documentation", &["docs"]),
    ("config", &["configuration"]),
    ("configuration", &["config"]),
    ("k8s", &["kubernetes"]),
    ("kubernetes", &["k8s"]),
];

pub fn default_stop_words() -> BTreeSet<String> {
    STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

pub fn default_synonyms() -> BTreeMap<String, Vec<String>> {
    SYNONYMS
        .iter()
        .map(|(word, alts)| {
            (
                word.to_string(),
                alts.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

/// A free-text search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub term: String,
    /// Extra frontmatter fields searched with `field_token` weight
    pub fields: Vec<String>,
    pub weights: SearchWeights,
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub stop_words: BTreeSet<String>,
    /// Content types whose items never match
    #[serde(default)]
    pub excluded_types: BTreeSet<String>,
}

impl SearchSpec {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            fields: Vec::new(),
            weights: SearchWeights::default(),
            synonyms: default_synonyms(),
            stop_words: default_stop_words(),
            excluded_types: BTreeSet::new(),
        }
    }

    /// Lowercased query with whitespace collapsed.
    pub fn phrase(&self) -> String {
        self.term
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tokens with stop words removed, each expanded to its synonym set.
    pub fn token_variants(&self) -> Vec<BTreeSet<String>> {
        let mut seen = BTreeSet::new();
        self.term
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|t| !self.stop_words.contains(t))
            .filter(|t| seen.insert(t.clone()))
            .map(|token| {
                let mut variants = BTreeSet::new();
                if let Some(alts) = self.synonyms.get(&token) {
                    variants.extend(alts.iter().map(|a| a.to_lowercase()));
                }
                variants.insert(token);
                variants
            })
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.term.trim().is_empty()
    }
}
