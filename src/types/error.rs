//! Error types for travel graph operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Source record set a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSet {
    /// Person rows
    People,
    /// Hotel stay rows
    HotelStays,
    /// Flight rows
    Flights,
    /// Bus trip rows
    BusTrips,
}

impl RecordSet {
    /// Get record set name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::HotelStays => "hotel_stays",
            Self::Flights => "flights",
            Self::BusTrips => "bus_trips",
        }
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error classification used when deciding how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Uniqueness constraint could not be created (non-fatal)
    Constraint,
    /// A single source row was rejected (skip-and-report)
    IngestionRow,
    /// Question could not be mapped to a known pattern
    Translation,
    /// Graph store failed or timed out
    Store,
    /// Answer text could not be generated or failed its content check
    Synthesis,
    /// Invalid configuration
    Config,
    /// Anything else (I/O, parsing, internal)
    Other,
}

/// Comprehensive error type for all travel graph operations.
#[derive(Error, Debug)]
pub enum GraphRagError {
    /// Uniqueness constraint creation failed
    #[error("Constraint error ({constraint}): {reason}")]
    ConstraintError {
        /// Constraint name (e.g. `person_id`)
        constraint: String,
        /// Underlying failure
        reason: String,
    },

    /// A single source row could not be ingested
    #[error("Row {row} of {record_set} rejected: {reason}")]
    IngestionRowError {
        /// Record set the row came from
        record_set: RecordSet,
        /// 1-based row number within the record set
        row: usize,
        /// Why the row was rejected
        reason: String,
    },

    /// Natural language to query translation failed
    #[error("Translation failed: {0}")]
    TranslationError(String),

    /// Graph store query execution failed or timed out
    #[error("Graph store error: {0}")]
    StoreError(String),

    /// Text generation service returned an error response
    #[error("Text generation error: {0}")]
    LlmError(String),

    /// Answer synthesis failed or violated the content contract
    #[error("Answer synthesis failed: {0}")]
    SynthesisError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// CSV reading error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP client error (text-generation APIs)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Embedded storage error (RocksDB)
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),

    /// Bincode serialization error
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenient result alias.
pub type Result<T> = std::result::Result<T, GraphRagError>;

impl GraphRagError {
    /// Create a translation error with context.
    pub fn translation(msg: impl Into<String>) -> Self {
        Self::TranslationError(msg.into())
    }

    /// Create a store error with context.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    /// Create a synthesis error with context.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::SynthesisError(msg.into())
    }

    /// Create a row rejection for the given record set.
    ///
    /// # Arguments
    ///
    /// * `record_set` - Record set the row belongs to
    /// * `row` - 1-based row number
    /// * `reason` - Why the row was rejected
    pub fn row(record_set: RecordSet, row: usize, reason: impl Into<String>) -> Self {
        Self::IngestionRowError {
            record_set,
            row,
            reason: reason.into(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConstraintError { .. } => ErrorKind::Constraint,
            Self::IngestionRowError { .. } => ErrorKind::IngestionRow,
            Self::TranslationError(_) => ErrorKind::Translation,
            Self::StoreError(_) | Self::StorageError(_) | Self::BincodeError(_) => ErrorKind::Store,
            Self::SynthesisError(_) => ErrorKind::Synthesis,
            Self::ConfigError(_) => ErrorKind::Config,
            _ => ErrorKind::Other,
        }
    }

    /// Check if error is recoverable.
    ///
    /// # Returns
    ///
    /// `true` if the same question may succeed when retried later
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StoreError(msg) | Self::TranslationError(msg) => msg.contains("timed out"),
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            Self::SynthesisError(_) => true,
            _ => false,
        }
    }
}
