//! # folio-store
//!
//! Persistence for the derived content indexes. Two [`Backend`]
//! implementations answer the same contract:
//!
//! - [`ArrayBackend`]: signed binary snapshot files, lazily loaded into
//!   process memory and scanned in place.
//! - [`SqliteBackend`] (feature `sqlite`): an embedded relational store with
//!   filtering, sorting and pagination pushed into SQL.
//!
//! Filtering, ordering and relevance scoring shared by both live in
//! [`eval`] and [`scoring`] so the two backends rank identically.

pub mod atomic;
pub mod backend;
pub mod envelope;
pub mod error;
pub mod eval;
pub mod scoring;

pub use atomic::write_atomic;
pub use backend::array::ArrayBackend;
#[cfg(feature = "sqlite")]
pub use backend::sqlite::SqliteBackend;
pub use backend::{Backend, BackendKind, DEFAULT_RECENT_LIMIT};
pub use envelope::{Serializer, SnapshotCodec};
pub use error::{Result, StoreError};
