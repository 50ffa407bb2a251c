//! Natural language to pattern translation.
//!
//! The text generator only chooses a pattern id and two names. Its output
//! is validated against a JSON Schema built from the pattern catalog; the
//! executable statement is then built locally from the chosen template, so
//! generated text never reaches the graph store as query text.

use crate::llm::client::{strip_markdown, Prompt, TextGenerator};
use crate::otel::{llm_span, record_llm_metrics, LlmPurpose};
use crate::query::{PatternCatalog, PatternId, PatternQuery};
use crate::store::Statement;
use crate::types::{GraphRagError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

/// Longest accepted entity name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Raw selection emitted by the text generator.
#[derive(Debug, Clone, Deserialize)]
struct PatternSelection {
    pattern: String,
    name1: String,
    name2: String,
    #[serde(default)]
    reasoning: String,
}

/// A validated translation, ready to execute.
#[derive(Debug, Clone, Serialize)]
pub struct TranslatedQuery {
    /// Chosen pattern and its parameters
    pub query: PatternQuery,
    /// Generator's stated reason for the choice
    pub reasoning: String,
    /// Attempts used (1 = accepted on first try)
    pub attempts: u32,
    #[serde(skip)]
    pub statement: Statement,
}

impl TranslatedQuery {
    pub fn pattern(&self) -> PatternId {
        self.query.pattern
    }

    /// Statement text with bound parameters.
    pub fn rendered(&self) -> String {
        self.statement.rendered()
    }
}

/// Translates questions into pattern instantiations.
pub struct QueryPlanner {
    generator: Arc<dyn TextGenerator>,
    max_attempts: u32,
    timeout: Duration,
    result_cap: usize,
}

impl QueryPlanner {
    /// Create a planner.
    ///
    /// # Arguments
    ///
    /// * `generator` - Text generation capability
    /// * `max_attempts` - First try plus re-prompts on invalid output
    /// * `timeout` - Upper bound per generation call
    /// * `result_cap` - `$limit` bound into every pattern
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        max_attempts: u32,
        timeout: Duration,
        result_cap: usize,
    ) -> Self {
        Self {
            generator,
            max_attempts: max_attempts.max(1),
            timeout,
            result_cap,
        }
    }

    /// Translate a question into a pattern instantiation.
    ///
    /// # Arguments
    ///
    /// * `question` - Free-text question
    /// * `schema` - Graph schema description (grounding context)
    /// * `catalog` - Pattern catalog (grounding context and allowed ids)
    ///
    /// # Returns
    ///
    /// `TranslatedQuery` with the pattern id, bound parameters and statement
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::TranslationError` if the question is empty, the
    /// generator fails or times out, or no attempt yields a valid selection
    pub async fn translate(
        &self,
        question: &str,
        schema: &str,
        catalog: &PatternCatalog,
    ) -> Result<TranslatedQuery> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GraphRagError::translation("question is empty"));
        }

        let validator = compile_selection_schema(catalog)?;
        let system = system_prompt(schema, catalog);
        let mut feedback: Option<String> = None;

        for attempt in 1..=self.max_attempts {
            let prompt = Prompt::json(system.clone(), user_prompt(question, feedback.as_deref()));
            let raw = self.generate(&prompt, attempt).await?;

            match parse_selection(&raw, &validator, catalog) {
                Ok(selection) => {
                    let query = catalog.instantiate(
                        selection.pattern,
                        &selection.name1,
                        &selection.name2,
                        self.result_cap,
                    );
                    debug!(
                        pattern = %query.pattern,
                        name1 = %query.name1,
                        name2 = %query.name2,
                        attempt,
                        "question translated"
                    );
                    return Ok(TranslatedQuery {
                        statement: query.to_statement(),
                        query,
                        reasoning: selection.reasoning,
                        attempts: attempt,
                    });
                }
                Err(reason) => {
                    warn!(attempt, reason = %reason, "rejected pattern selection");
                    feedback = Some(reason);
                }
            }
        }

        Err(GraphRagError::translation(format!(
            "no valid pattern selection after {} attempt(s): {}",
            self.max_attempts,
            feedback.unwrap_or_default()
        )))
    }

    async fn generate(&self, prompt: &Prompt, attempt: u32) -> Result<String> {
        let span = llm_span(LlmPurpose::Translate, self.generator.model(), attempt);
        async {
            match tokio::time::timeout(self.timeout, self.generator.generate(prompt)).await {
                Ok(Ok(text)) => {
                    record_llm_metrics(text.chars().count());
                    Ok(text)
                }
                Ok(Err(e)) => Err(GraphRagError::translation(format!("text generation failed: {}", e))),
                Err(_) => Err(GraphRagError::translation(format!(
                    "text generation timed out after {:?}",
                    self.timeout
                ))),
            }
        }
        .instrument(span)
        .await
    }
}

/// Validated selection.
struct Selection {
    pattern: PatternId,
    name1: String,
    name2: String,
    reasoning: String,
}

/// JSON Schema for a selection; `pattern` is restricted to the catalog ids.
pub fn selection_schema(catalog: &PatternCatalog) -> JsonValue {
    let name = json!({"type": "string", "minLength": 1, "maxLength": MAX_NAME_CHARS});
    json!({
        "type": "object",
        "properties": {
            "pattern": {"type": "string", "enum": catalog.ids()},
            "name1": name,
            "name2": name,
            "reasoning": {"type": "string"}
        },
        "required": ["pattern", "name1", "name2"]
    })
}

fn compile_selection_schema(catalog: &PatternCatalog) -> Result<jsonschema::JSONSchema> {
    let schema = selection_schema(catalog);
    jsonschema::JSONSchema::compile(&schema)
        .map_err(|e| GraphRagError::InternalError(format!("invalid selection schema: {}", e)))
}

/// Parse and validate generator output. Errors are fed back into the next prompt.
fn parse_selection(
    raw: &str,
    validator: &jsonschema::JSONSchema,
    catalog: &PatternCatalog,
) -> std::result::Result<Selection, String> {
    let text = strip_markdown(raw);
    if text.is_empty() {
        return Err("output was empty".to_string());
    }

    let mut value: JsonValue =
        serde_json::from_str(text).map_err(|e| format!("output is not a JSON object: {}", e))?;

    // accept `shared-hotel` and case variants of catalog ids
    if let Some(pattern) = value.get("pattern").and_then(JsonValue::as_str) {
        if let Ok(id) = pattern.parse::<PatternId>() {
            value["pattern"] = JsonValue::String(id.as_str().to_string());
        }
    }

    if let Err(errors) = validator.validate(&value) {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(format!(
            "output does not match the selection schema: {}; allowed patterns: {}",
            messages.join("; "),
            catalog.ids().join(", ")
        ));
    }

    let selection: PatternSelection =
        serde_json::from_value(value).map_err(|e| format!("malformed selection: {}", e))?;
    let pattern = selection.pattern.parse::<PatternId>()?;

    Ok(Selection {
        pattern,
        name1: check_name("name1", &selection.name1)?,
        name2: check_name("name2", &selection.name2)?,
        reasoning: selection.reasoning,
    })
}

fn check_name(field: &str, value: &str) -> std::result::Result<String, String> {
    let name = value.trim();
    if name.is_empty() {
        return Err(format!("{} is empty", field));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("{} is longer than {} characters", field, MAX_NAME_CHARS));
    }
    if name.chars().any(char::is_control) {
        return Err(format!("{} contains control characters", field));
    }
    Ok(name.to_string())
}

fn system_prompt(schema: &str, catalog: &PatternCatalog) -> String {
    format!(
        r#"You map questions about a travel and accommodation graph to one of a fixed set of query patterns.

{schema}

{patterns}
Rules:
1. Choose exactly one pattern id from: {ids}.
2. Extract the two people's names as written in the question (full names when given).
3. Do not write a query. Only choose the pattern and the names.
4. Questions may be in Turkish or English.

Return ONLY a JSON object:
{{"pattern": "<pattern id>", "name1": "<first person>", "name2": "<second person>", "reasoning": "<one sentence>"}}"#,
        schema = schema,
        patterns = catalog.describe(),
        ids = catalog.ids().join(", "),
    )
}

fn user_prompt(question: &str, feedback: Option<&str>) -> String {
    match feedback {
        None => format!("Question: {}\n\nJSON:", question),
        Some(reason) => format!(
            "Question: {}\n\nYour previous answer was rejected: {}\nReturn a corrected JSON object.\n\nJSON:",
            question, reason
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::schema_description;
    use crate::types::PropertyValue;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with scripted outputs in order and records every prompt.
    fn scripted(replies: &[&str]) -> (Arc<dyn TextGenerator>, Arc<Mutex<Vec<Prompt>>>) {
        let queue = Mutex::new(replies.iter().map(|r| r.to_string()).collect::<VecDeque<_>>());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let generator = move |prompt: &Prompt| -> Result<String> {
            log.lock().unwrap().push(prompt.clone());
            Ok(queue.lock().unwrap().pop_front().unwrap_or_default())
        };
        let generator: Arc<dyn TextGenerator> = Arc::new(generator);
        (generator, seen)
    }

    fn planner(generator: Arc<dyn TextGenerator>) -> QueryPlanner {
        QueryPlanner::new(generator, 2, Duration::from_secs(1), 10)
    }

    #[tokio::test]
    async fn test_fenced_selection_is_accepted() {
        let (generator, _) = scripted(&[
            "```json\n{\"pattern\": \"shared-hotel\", \"name1\": \"Ali Veli\", \"name2\": \"Ayşe Kaya\", \"reasoning\": \"birlikte kaldı\"}\n```",
        ]);
        let translated = planner(generator)
            .translate("Ali Veli ve Ayşe Kaya nerede birlikte kaldı?", &schema_description(), &PatternCatalog)
            .await
            .unwrap();

        assert_eq!(translated.pattern(), PatternId::SharedHotel);
        assert_eq!(translated.attempts, 1);
        assert_eq!(translated.statement.params["name2"], PropertyValue::from("Ayşe Kaya"));
        assert_eq!(translated.statement.params["limit"], PropertyValue::Int(10));
    }

    #[tokio::test]
    async fn test_unknown_pattern_is_reprompted_then_rejected() {
        let raw = r#"{"pattern": "MATCH (n) DETACH DELETE n", "name1": "a", "name2": "b"}"#;
        let (generator, seen) = scripted(&[raw, raw]);
        let err = planner(generator)
            .translate("who knows whom?", "schema", &PatternCatalog)
            .await
            .unwrap_err();

        assert!(matches!(err, GraphRagError::TranslationError(_)));
        let prompts = seen.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].user.contains("previous answer was rejected"));
        assert!(prompts[1].user.contains("relationship_path"));
    }

    #[tokio::test]
    async fn test_second_attempt_can_recover() {
        let (generator, _) = scripted(&[
            "I think they both went to İstanbul",
            r#"{"pattern": "shared_destination", "name1": "Ali", "name2": "Ayşe"}"#,
        ]);
        let translated = planner(generator)
            .translate("Where did Ali and Ayşe both travel?", "schema", &PatternCatalog)
            .await
            .unwrap();
        assert_eq!(translated.pattern(), PatternId::SharedDestination);
        assert_eq!(translated.attempts, 2);
    }

    #[tokio::test]
    async fn test_control_characters_in_names_are_rejected() {
        let raw = "{\"pattern\": \"relationship_path\", \"name1\": \"Ali\\u0000\", \"name2\": \"Ayşe\"}";
        let (generator, _) = scripted(&[raw, raw]);
        let err = planner(generator)
            .translate("Ali ile Ayşe arasındaki ilişki nedir?", "schema", &PatternCatalog)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("control characters"));
    }

    #[tokio::test]
    async fn test_empty_question_never_calls_generator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let generator = move |_: &Prompt| -> Result<String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        };
        let err = planner(Arc::new(generator))
            .translate("   ", "schema", &PatternCatalog)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphRagError::TranslationError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct StalledGenerator;

    #[async_trait]
    impl TextGenerator for StalledGenerator {
        async fn generate(&self, _prompt: &Prompt) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_translation_error() {
        let planner = QueryPlanner::new(Arc::new(StalledGenerator), 2, Duration::from_millis(20), 10);
        let err = planner
            .translate("Ali ve Ayşe?", "schema", &PatternCatalog)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphRagError::TranslationError(ref m) if m.contains("timed out")));
        assert!(err.is_recoverable());
    }
}
