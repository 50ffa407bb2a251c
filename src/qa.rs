//! Question answering orchestrator.
//!
//! Per question: translate → execute → render. No error crosses
//! [`QaService::answer`]; failures become explanatory text.
//!
//! Stage trail: `received → translated → executed → rendered → done`, or
//! `received [→ translated] → failed → done` when translation or execution fails.

use crate::config::{LlmConfig, QueryConfig};
use crate::context::AppContext;
use crate::llm::{AnswerSource, AnswerSynthesizer, QueryPlanner, TextGenerator, TranslatedQuery};
use crate::query::PatternCatalog;
use crate::schema::schema_description;
use crate::store::GraphClient;
use crate::types::{ErrorKind, GraphRagError, Row};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QaStage {
    Received,
    Translated,
    Executed,
    Rendered,
    Failed,
    Done,
}

impl fmt::Display for QaStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Translated => "translated",
            Self::Executed => "executed",
            Self::Rendered => "rendered",
            Self::Failed => "failed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything that happened while answering one question.
#[derive(Debug)]
pub struct QaOutcome {
    pub request_id: Uuid,
    /// Text shown to the caller (never blank)
    pub answer: String,
    pub stages: Vec<QaStage>,
    pub translation: Option<TranslatedQuery>,
    pub rows: Vec<Row>,
    /// How the answer text was produced, if rendering was reached
    pub source: Option<AnswerSource>,
    /// Translation/store failure, or the synthesis error behind a templated answer
    pub error: Option<GraphRagError>,
}

impl QaOutcome {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            answer: String::new(),
            stages: vec![QaStage::Received],
            translation: None,
            rows: Vec::new(),
            source: None,
            error: None,
        }
    }

    fn fail(mut self, error: GraphRagError) -> Self {
        warn!(error = %error, kind = ?error.kind(), "question failed");
        self.answer = failure_message(&error);
        self.error = Some(error);
        self.stages.push(QaStage::Failed);
        self.stages.push(QaStage::Done);
        self
    }

    /// `true` if an answer was rendered from query results.
    pub fn succeeded(&self) -> bool {
        self.stages.contains(&QaStage::Rendered)
    }
}

/// Answers natural-language questions about the graph.
pub struct QaService {
    graph: GraphClient,
    planner: QueryPlanner,
    synthesizer: AnswerSynthesizer,
    catalog: PatternCatalog,
    schema: String,
}

impl QaService {
    /// Create a service.
    ///
    /// # Arguments
    ///
    /// * `graph` - Graph store client
    /// * `generator` - Text generation capability (translation and synthesis)
    /// * `llm` - Attempts and timeout for generation calls
    /// * `query` - Result cap
    pub fn new(
        graph: GraphClient,
        generator: Arc<dyn TextGenerator>,
        llm: &LlmConfig,
        query: &QueryConfig,
    ) -> Self {
        Self {
            graph,
            planner: QueryPlanner::new(Arc::clone(&generator), llm.max_attempts, llm.timeout(), query.result_cap),
            synthesizer: AnswerSynthesizer::new(generator, llm.timeout()),
            catalog: PatternCatalog,
            schema: schema_description(),
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(ctx.graph.clone(), Arc::clone(&ctx.llm), &ctx.config.llm, &ctx.config.query)
    }

    /// Answer a question. Never fails and never returns blank text.
    pub async fn answer(&self, question: &str) -> String {
        self.answer_detailed(question).await.answer
    }

    /// Answer a question, keeping the intermediate steps.
    pub async fn answer_detailed(&self, question: &str) -> QaOutcome {
        let outcome = QaOutcome::new();
        let span = info_span!("question", request_id = %outcome.request_id);
        self.run(question, outcome).instrument(span).await
    }

    async fn run(&self, question: &str, mut outcome: QaOutcome) -> QaOutcome {
        info!(question, "question received");

        let translated = match self.planner.translate(question, &self.schema, &self.catalog).await {
            Ok(t) => t,
            Err(e) => return outcome.fail(e),
        };
        outcome.stages.push(QaStage::Translated);

        let rows = match self.graph.execute(&translated.statement).await {
            Ok(rows) => rows,
            Err(e) => {
                outcome.translation = Some(translated);
                return outcome.fail(e);
            }
        };
        outcome.stages.push(QaStage::Executed);
        info!(pattern = %translated.pattern(), rows = rows.len(), "query executed");

        let answer = self.synthesizer.render(question, &translated, &rows).await;
        outcome.stages.push(QaStage::Rendered);
        outcome.stages.push(QaStage::Done);
        outcome.answer = answer.text;
        outcome.source = Some(answer.source);
        outcome.error = answer.fallback_reason;
        outcome.translation = Some(translated);
        outcome.rows = rows;
        outcome
    }
}

/// User-facing explanation for a failed question.
pub fn failure_message(error: &GraphRagError) -> String {
    match error.kind() {
        ErrorKind::Translation => format!(
            "I could not turn your question into one of the supported searches \
             (relationship between two people, shared destinations, shared hotels). \
             Please name both people explicitly. ({})",
            error
        ),
        ErrorKind::Store if error.is_recoverable() => format!(
            "The graph database did not respond in time. Please try again shortly. ({})",
            error
        ),
        ErrorKind::Store => format!("The graph database could not run the search. ({})", error),
        _ => format!("Something went wrong while answering your question. ({})", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Prompt;
    use crate::store::{GraphStore, Statement};
    use crate::types::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    struct DownStore;

    #[async_trait]
    impl GraphStore for DownStore {
        async fn execute(&self, _statement: &Statement) -> Result<Vec<Row>> {
            Err(GraphRagError::store("connection refused"))
        }

        fn backend(&self) -> &'static str {
            "down"
        }
    }

    fn service(generator: impl Fn(&Prompt) -> Result<String> + Send + Sync + 'static) -> QaService {
        QaService::new(
            GraphClient::new(Arc::new(DownStore), Duration::from_secs(1)),
            Arc::new(generator),
            &LlmConfig::default(),
            &QueryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_translation_failure_is_rendered() {
        let qa = service(|_: &Prompt| -> Result<String> { Ok("no idea".to_string()) });
        let outcome = qa.answer_detailed("hello?").await;

        assert_eq!(outcome.stages, vec![QaStage::Received, QaStage::Failed, QaStage::Done]);
        assert!(outcome.answer.contains("supported searches"));
        assert!(matches!(outcome.error, Some(GraphRagError::TranslationError(_))));
    }

    #[tokio::test]
    async fn test_store_failure_is_rendered() {
        let qa = service(|_: &Prompt| -> Result<String> {
            Ok(r#"{"pattern": "shared_hotel", "name1": "Ali", "name2": "Ayşe"}"#.to_string())
        });
        let outcome = qa.answer_detailed("Ali ve Ayşe nerede kaldı?").await;

        assert_eq!(
            outcome.stages,
            vec![QaStage::Received, QaStage::Translated, QaStage::Failed, QaStage::Done]
        );
        assert!(outcome.answer.contains("could not run the search"));
        assert!(outcome.translation.is_some());
        assert!(!outcome.succeeded());
    }
}
