//! Tracing setup and span helpers.
//!
//! Spans follow OpenTelemetry semantic conventions so an exporting
//! subscriber can forward them unchanged:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//! - https://opentelemetry.io/docs/specs/semconv/gen-ai/gen-ai-spans/
//!
//! **Database spans** (`db`): `db.system.name` is the backend (`neo4j` or
//! `rocksdb`), `db.operation.name` the statement kind's operation,
//! `db.collection.name` its target and `db.query.text` the Cypher text.
//! Parameter values are never recorded.
//!
//! **Text generation spans** (`gen_ai`): `gen_ai.operation.name` is `chat`,
//! `gen_ai.request.model` the model, `purpose` either `translate` or
//! `synthesize`.

pub mod db;
pub mod llm;

pub use db::{record_db_metrics, statement_span};
pub use llm::{llm_span, record_llm_metrics, LlmPurpose};

use crate::types::{GraphRagError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "travel_graph=info,tgraph=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Install the global subscriber.
///
/// # Arguments
///
/// * `format` - Output format
/// * `filter` - Filter directives; falls back to `RUST_LOG`, then [`DEFAULT_FILTER`]
///
/// # Errors
///
/// Returns `GraphRagError::ConfigError` if the filter is invalid or a
/// subscriber is already installed
pub fn init_tracing(format: LogFormat, filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER)),
    }
    .map_err(|e| GraphRagError::ConfigError(format!("invalid log filter: {}", e)))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|_| GraphRagError::ConfigError("tracing already initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
