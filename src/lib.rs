//! Travel graph - travel and accommodation knowledge graph with
//! natural-language relationship questions.
//!
//! Two pipelines share one graph store:
//! - Ingestion: tabular people, hotel stay, flight and bus trip records
//!   become `Person`, `Hotel`, `City`, `Airline` and `BusCompany` nodes with
//!   `STAYED_AT`, `LOCATED_IN`, `FLEW` and `TOOK_BUS` relationships
//! - Question answering: a question is mapped to one of three fixed query
//!   patterns, executed with bound parameters, and rendered as prose
//!
//! The graph store (Neo4j or an embedded RocksDB graph) and the text
//! generation service are injected through [`context::AppContext`].

pub mod types;
pub mod config;
pub mod otel;
pub mod store;
pub mod schema;
pub mod query;
pub mod ingest;
pub mod llm;
pub mod qa;

// Process-wide wiring
pub mod context;

pub use config::Config;
pub use context::AppContext;
pub use qa::{QaOutcome, QaService, QaStage};
pub use types::{GraphRagError, Result};
