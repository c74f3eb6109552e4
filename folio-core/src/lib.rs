//! # folio-core
//!
//! Content indexing and querying for a flat-file CMS.
//!
//! Markdown files with YAML frontmatter are parsed into [`ContentRecord`]s,
//! indexed into the structures a [`folio_store::Backend`] persists, and read
//! back through the [`Repository`] and its fluent [`Query`] builder. The
//! [`Engine`] ties these together for one site root.

pub mod backends;
pub mod config;
pub mod engine;
pub mod fingerprint;
pub mod frontmatter;
pub mod indexer;
pub mod markdown;
pub mod models;
pub mod page_cache;
pub mod parser;
pub mod query;
pub mod repository;
pub mod slug;
pub mod url;
pub mod validation;

pub use config::{Config, ConfigError};
pub use engine::{Engine, EngineError, Rendered};
pub use fingerprint::Fingerprint;
pub use folio_store::{Backend, BackendKind};
pub use indexer::{IndexError, Indexer, RebuildReport};
pub use models::ContentRecord;
pub use page_cache::{FilePageCache, PageCache};
pub use query::Query;
pub use repository::{Repository, RepositoryError};
pub use slug::slugify;
pub use validation::{Diagnostic, DiagnosticKind};
