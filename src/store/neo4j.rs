//! Neo4j backend over the Bolt protocol.

use crate::config::StoreConfig;
use crate::store::{GraphStore, Statement};
use crate::types::{GraphRagError, PropertyValue, Result, Row};
use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use tracing::info;

/// Neo4j-backed graph store.
///
/// `neo4rs::Graph` owns the connection pool; the store is shared behind an
/// `Arc` by every clone of the [`crate::store::GraphClient`].
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect to the server named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::ConfigError` if no URI is configured and
    /// `GraphRagError::StoreError` if the connection fails
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let uri = config
            .uri
            .as_deref()
            .ok_or_else(|| GraphRagError::ConfigError("neo4j backend requires store.uri".to_string()))?;

        let mut builder = ConfigBuilder::default()
            .uri(uri)
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(db) = config.database.as_deref() {
            builder = builder.db(db);
        }
        let neo_config = builder
            .build()
            .map_err(|e| GraphRagError::ConfigError(format!("invalid neo4j configuration: {}", e)))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphRagError::store(format!("failed to connect to {}: {}", uri, e)))?;

        info!(uri = %uri, "connected to Neo4j");
        Ok(Self { graph })
    }

    /// Bind statement parameters. Values never touch the query text.
    fn bind(statement: &Statement) -> Query {
        statement
            .params
            .iter()
            .fold(query(&statement.text), |q, (key, value)| match value {
                PropertyValue::Bool(b) => q.param(key, *b),
                PropertyValue::Int(i) => q.param(key, *i),
                PropertyValue::Float(f) => q.param(key, *f),
                PropertyValue::Text(s) => q.param(key, s.as_str()),
            })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        let mut stream = self
            .graph
            .execute(Self::bind(statement))
            .await
            .map_err(|e| GraphRagError::store(format!("Neo4j execution failed: {}", e)))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| GraphRagError::store(format!("Neo4j stream failed: {}", e)))?
        {
            let row: Row = row
                .to()
                .map_err(|e| GraphRagError::store(format!("unreadable Neo4j row: {}", e)))?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn backend(&self) -> &'static str {
        "neo4j"
    }
}
