//! CLI command implementations.

pub mod lint;
pub mod query;
pub mod rebuild;
pub mod render;
pub mod route;
pub mod status;

pub use lint::lint;
pub use query::{query, QueryOptions};
pub use rebuild::rebuild;
pub use render::render;
pub use route::route;
pub use status::status;
