//! Query pattern library.

pub mod patterns;

pub use patterns::{Pattern, PatternCatalog, PatternId, PatternQuery, CATALOG_VERSION};
