//! Application context.
//!
//! Built once at process start and passed by reference to every component.

use crate::config::Config;
use crate::ingest::IngestPipeline;
use crate::llm::{LlmClient, Prompt, TextGenerator};
use crate::qa::QaService;
use crate::schema::SchemaBootstrapper;
use crate::store::GraphClient;
use crate::types::{GraphRagError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Store handle, text generator and configuration.
pub struct AppContext {
    pub config: Config,
    pub graph: GraphClient,
    pub llm: Arc<dyn TextGenerator>,
}

/// Stand-in generator when no API key is configured; every call fails.
struct UnconfiguredGenerator {
    reason: String,
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Err(GraphRagError::ConfigError(self.reason.clone()))
    }
}

impl AppContext {
    /// Assemble a context from parts.
    pub fn new(config: Config, graph: GraphClient, llm: Arc<dyn TextGenerator>) -> Self {
        Self { config, graph, llm }
    }

    /// Connect to the configured store and text generation service.
    ///
    /// A missing API key is not fatal: loading and statistics work without
    /// one, and questions are answered with an explanation of the problem.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::StoreError` if the store cannot be opened
    pub async fn connect(config: Config) -> Result<Self> {
        let graph = GraphClient::connect(&config.store).await?;
        let llm: Arc<dyn TextGenerator> = match LlmClient::from_config(&config.llm) {
            Ok(client) => Arc::new(client),
            Err(GraphRagError::ConfigError(reason)) => {
                warn!(reason = %reason, "text generation unavailable");
                Arc::new(UnconfiguredGenerator { reason })
            }
            Err(e) => return Err(e),
        };
        info!(backend = graph.backend(), model = %config.llm.model, "context ready");
        Ok(Self::new(config, graph, llm))
    }

    pub fn bootstrapper(&self) -> SchemaBootstrapper<'_> {
        SchemaBootstrapper::new(&self.graph)
    }

    pub fn ingest_pipeline(&self) -> IngestPipeline<'_> {
        IngestPipeline::new(&self.graph, &self.config.ingest)
    }

    pub fn qa_service(&self) -> QaService {
        QaService::from_context(self)
    }
}
