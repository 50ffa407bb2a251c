//! Graph store client.
//!
//! Every interaction with the graph goes through a [`Statement`]: a kind from
//! a closed catalog, the Cypher text for that kind, and bound parameters.
//! Statement text is assembled from compile-time constants only; record
//! values travel exclusively in `params`.
//!
//! Backends implement [`GraphStore`]:
//! - [`Neo4jStore`]: Bolt connection to a Neo4j server
//! - [`EmbeddedStore`]: persistent local graph on RocksDB that interprets the
//!   statement catalog natively
//!
//! [`GraphClient`] wraps a backend with timeouts, tracing spans and error mapping.

pub mod embedded;
pub mod neo4j;

pub use embedded::EmbeddedStore;
pub use neo4j::Neo4jStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::otel::db::{record_db_metrics, statement_span};
use crate::query::PatternId;
use crate::types::{GraphRagError, Params, PropertyValue, Result, Row};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};

/// Closed catalog of statements the system issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Uniqueness constraint on one node label
    CreateConstraint,
    /// Delete every node and relationship
    WipeAll,
    /// Strict create of a Person node
    CreatePerson,
    /// Upsert Hotel/City, create STAYED_AT, merge LOCATED_IN
    CreateHotelStay,
    /// Upsert Airline/origin/destination, create FLEW
    CreateFlight,
    /// Upsert BusCompany/origin/destination, create TOOK_BUS
    CreateBusTrip,
    /// Node and relationship counts
    CountGraph,
    /// Query pattern from the pattern library
    Pattern(PatternId),
}

impl StatementKind {
    /// Operation name (maps to `db.operation.name`).
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateConstraint => "create_constraint",
            Self::WipeAll => "delete",
            Self::CreatePerson => "create",
            Self::CreateHotelStay | Self::CreateFlight | Self::CreateBusTrip => "merge",
            Self::CountGraph => "count",
            Self::Pattern(_) => "match",
        }
    }

    /// Target of the operation (maps to `db.collection.name`).
    pub fn target(&self) -> &'static str {
        match self {
            Self::CreateConstraint => "schema",
            Self::WipeAll | Self::CountGraph => "graph",
            Self::CreatePerson => "Person",
            Self::CreateHotelStay => "STAYED_AT",
            Self::CreateFlight => "FLEW",
            Self::CreateBusTrip => "TOOK_BUS",
            Self::Pattern(id) => id.as_str(),
        }
    }
}

/// A parameterized graph statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Catalog entry
    pub kind: StatementKind,
    /// Cypher text (no interpolated values)
    pub text: String,
    /// Bound parameters
    pub params: Params,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(kind: StatementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            params: Params::new(),
        }
    }

    /// Replace all parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Bind one parameter.
    pub fn param(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Delete every node and relationship.
    pub fn wipe_all() -> Self {
        Self::new(StatementKind::WipeAll, "MATCH (n) DETACH DELETE n")
    }

    /// Count nodes and relationships.
    pub fn count_graph() -> Self {
        Self::new(
            StatementKind::CountGraph,
            "CALL { MATCH (n) RETURN count(n) AS nodes } \
             CALL { MATCH ()-[r]->() RETURN count(r) AS relationships } \
             RETURN nodes, relationships",
        )
    }

    /// Text plus bound parameters, for answer prompts and verbose CLI output.
    pub fn rendered(&self) -> String {
        if self.params.is_empty() {
            return self.text.clone();
        }
        let bindings: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("${} = {}", k, v))
            .collect();
        format!("{}\n// params: {}", self.text, bindings.join(", "))
    }

    /// Text plus parameter names only, for logs. Bound values (emails,
    /// phone numbers) never leave the statement.
    pub fn redacted(&self) -> String {
        if self.params.is_empty() {
            return self.text.clone();
        }
        let names: Vec<String> = self.params.keys().map(|k| format!("${}", k)).collect();
        format!("{}\n// params: {}", self.text, names.join(", "))
    }
}

/// Storage backend capable of executing catalog statements.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute one statement and collect its rows.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::StoreError` (or a storage error) if execution fails
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Backend name (maps to `db.system.name`).
    fn backend(&self) -> &'static str;
}

/// Node and relationship totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub nodes: u64,
    pub relationships: u64,
}

/// Graph store client owned by the application context.
///
/// Cheap to clone; all clones share the backend and its connection pool.
#[derive(Clone)]
pub struct GraphClient {
    store: Arc<dyn GraphStore>,
    timeout: Duration,
}

impl GraphClient {
    /// Wrap a backend.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend implementation
    /// * `timeout` - Upper bound for a single statement
    pub fn new(store: Arc<dyn GraphStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Open the backend named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::StoreError` if the backend cannot be reached or opened
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let store: Arc<dyn GraphStore> = match config.backend {
            StoreBackend::Neo4j => Arc::new(Neo4jStore::connect(config).await?),
            StoreBackend::Embedded => Arc::new(EmbeddedStore::open(&config.path)?),
        };
        Ok(Self::new(store, config.timeout()))
    }

    /// Backend name.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Shared handle to the backend.
    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    /// Execute a statement under the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::StoreError` on failure or timeout
    pub async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        let span = statement_span(statement, self.store.backend());
        async {
            debug!(statement = %statement.redacted(), "executing statement");
            let rows = match tokio::time::timeout(self.timeout, self.store.execute(statement)).await
            {
                Ok(Ok(rows)) => rows,
                Ok(Err(GraphRagError::StoreError(msg))) => return Err(GraphRagError::StoreError(msg)),
                Ok(Err(e)) => return Err(GraphRagError::store(e.to_string())),
                Err(_) => {
                    return Err(GraphRagError::store(format!(
                        "{} {} timed out after {:?}",
                        statement.kind.operation(),
                        statement.kind.target(),
                        self.timeout
                    )))
                }
            };
            record_db_metrics(Some(rows.len()), None);
            Ok(rows)
        }
        .instrument(span)
        .await
    }

    /// Execute a statement and discard its rows.
    pub async fn run(&self, statement: &Statement) -> Result<()> {
        self.execute(statement).await.map(|_| ())
    }

    /// Count nodes and relationships.
    pub async fn counts(&self) -> Result<GraphCounts> {
        let rows = self.execute(&Statement::count_graph()).await?;
        let row = rows
            .first()
            .ok_or_else(|| GraphRagError::store("count returned no rows"))?;
        let read = |key: &str| -> Result<u64> {
            row.get(key)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| GraphRagError::store(format!("count row missing '{}'", key)))
        };
        Ok(GraphCounts {
            nodes: read("nodes")?,
            relationships: read("relationships")?,
        })
    }
}
