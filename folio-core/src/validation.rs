//! Advisory diagnostics for content files.
//!
//! Diagnostics are data: they are collected per file and reported, never
//! raised. Only [`DiagnosticKind::Structural`] marks a file that could not
//! be indexed at all.

use crate::models::ContentRecord;
use crate::parser::normalize_date;
use crate::slug::is_valid_slug;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    EmptyTitle,
    PaddedTitle,
    EmptySlug,
    InvalidStatus { status: String },
    InvalidSlug { slug: String },
    InvalidDate { field: String, value: String },
    DuplicateSlug {
        content_type: String,
        slug: String,
        first: PathBuf,
    },
    DuplicateId { id: String, first: PathBuf },
    DuplicateRoute { path: String, first: PathBuf },
    UnknownTerm { taxonomy: String, term: String },
    /// The file could not be parsed and was not indexed
    Structural { message: String },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::EmptyTitle => write!(f, "title is empty"),
            DiagnosticKind::PaddedTitle => {
                write!(f, "title has leading or trailing whitespace")
            }
            DiagnosticKind::EmptySlug => write!(f, "slug is empty"),
            DiagnosticKind::InvalidStatus { status } => write!(
                f,
                "status '{status}' is not one of draft, published, private, unlisted"
            ),
            DiagnosticKind::InvalidSlug { slug } => {
                write!(f, "slug '{slug}' must match ^[a-z0-9-]+$")
            }
            DiagnosticKind::InvalidDate { field, value } => {
                write!(f, "{field} '{value}' is not a recognised date")
            }
            DiagnosticKind::DuplicateSlug {
                content_type,
                slug,
                first,
            } => write!(
                f,
                "duplicate slug '{slug}' in type '{content_type}', already used by {}",
                first.display()
            ),
            DiagnosticKind::DuplicateId { id, first } => {
                write!(f, "duplicate id '{id}', already used by {}", first.display())
            }
            DiagnosticKind::DuplicateRoute { path, first } => {
                write!(f, "route '{path}' is already taken by {}", first.display())
            }
            DiagnosticKind::UnknownTerm { taxonomy, term } => {
                write!(f, "term '{term}' is not registered in taxonomy '{taxonomy}'")
            }
            DiagnosticKind::Structural { message } => write!(f, "{message}"),
        }
    }
}

/// One file-scoped problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(path: impl Into<PathBuf>, kind: DiagnosticKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Structural { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.kind)
    }
}

/// Check a parsed record. Never fails; returns every problem found.
pub fn validate(record: &ContentRecord) -> Vec<DiagnosticKind> {
    let mut problems = Vec::new();

    if record.title.trim().is_empty() {
        problems.push(DiagnosticKind::EmptyTitle);
    } else if record.title.trim() != record.title {
        problems.push(DiagnosticKind::PaddedTitle);
    }
    if record.slug.trim().is_empty() {
        problems.push(DiagnosticKind::EmptySlug);
    } else if !is_valid_slug(&record.slug) {
        problems.push(DiagnosticKind::InvalidSlug {
            slug: record.slug.clone(),
        });
    }
    if !record.status.is_known() {
        problems.push(DiagnosticKind::InvalidStatus {
            status: record.status.as_str().to_string(),
        });
    }
    for (field, value) in [("date", &record.date), ("updated", &record.updated)] {
        if let Some(value) = value {
            if normalize_date(value).is_none() {
                problems.push(DiagnosticKind::InvalidDate {
                    field: field.to_string(),
                    value: value.clone(),
                });
            }
        }
    }

    problems
}
