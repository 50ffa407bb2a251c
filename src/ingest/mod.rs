//! Tabular ingestion: column mapping, CSV reading, graph-construction
//! statements and the loading pipeline.

pub mod columns;
pub mod pipeline;
pub mod reader;
pub mod statements;

pub use columns::{ColumnMapping, SourceFiles};
pub use pipeline::{IngestPipeline, LoadSummary, SetSummary};
pub use reader::{RecordBatch, RecordSets, SourcePaths};
