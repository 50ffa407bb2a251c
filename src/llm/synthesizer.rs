//! Answer synthesis.
//!
//! Rendering rules:
//! - no rows: a fixed message naming the pattern searched and both names,
//!   produced without calling the text generator
//! - rows: generated prose, accepted only if it passes the
//!   [`ContentContract`] derived from the rows; otherwise a deterministic
//!   rendering of the rows is returned instead

use crate::llm::client::{Prompt, TextGenerator};
use crate::llm::planner::TranslatedQuery;
use crate::otel::{llm_span, record_llm_metrics, LlmPurpose};
use crate::query::{PatternCatalog, PatternId, PatternQuery};
use crate::types::{GraphRagError, Result, Row};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{warn, Instrument};

/// Row columns naming the place a relationship leads to.
const PLACE_KEYS: [&str; 3] = ["hotel", "city", "endpoint"];

/// Relationship properties holding the stay or travel date.
const DATE_KEYS: [&str; 3] = ["check_in", "flight_date", "travel_date"];

/// Terms a generated answer must mention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentContract {
    pub required: Vec<String>,
}

impl ContentContract {
    /// Derive the contract from result rows: every hotel, city or endpoint
    /// name and every stay or travel date.
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut required = Vec::new();
        for row in rows {
            for key in PLACE_KEYS {
                if let Some(name) = row.get(key).and_then(JsonValue::as_str) {
                    push_unique(&mut required, name);
                }
            }
            for value in row.values() {
                collect_dates(value, &mut required);
            }
        }
        Self { required }
    }

    /// Required terms absent from `text` (case-insensitive).
    pub fn missing(&self, text: &str) -> Vec<&str> {
        let haystack = text.to_lowercase();
        self.required
            .iter()
            .filter(|term| !haystack.contains(&term.to_lowercase()))
            .map(String::as_str)
            .collect()
    }

    /// Check generated text.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::SynthesisError` if the text is blank or misses a required term
    pub fn check(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(GraphRagError::synthesis("generated answer is blank"));
        }
        let missing = self.missing(text);
        if !missing.is_empty() {
            return Err(GraphRagError::synthesis(format!(
                "generated answer omits: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

fn push_unique(terms: &mut Vec<String>, term: &str) {
    let term = term.trim();
    if !term.is_empty() && !terms.iter().any(|t| t == term) {
        terms.push(term.to_string());
    }
}

fn collect_dates(value: &JsonValue, out: &mut Vec<String>) {
    match value {
        JsonValue::Object(map) => {
            for (key, inner) in map {
                match inner.as_str() {
                    Some(date) if DATE_KEYS.contains(&key.as_str()) => push_unique(out, date),
                    _ => collect_dates(inner, out),
                }
            }
        }
        JsonValue::Array(items) => items.iter().for_each(|item| collect_dates(item, out)),
        _ => {}
    }
}

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Fixed message for an empty result
    NoResults,
    /// Generated prose that passed the content check
    Generated,
    /// Deterministic rendering of the rows
    Template,
}

/// Rendered answer.
#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
    /// Why generated prose was not used (`SynthesisError`)
    pub fallback_reason: Option<GraphRagError>,
}

/// Turns result rows into an answer.
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Render an answer. Never fails: synthesis errors fall back to the template.
    ///
    /// # Arguments
    ///
    /// * `question` - Original question
    /// * `executed` - Translated query that produced the rows
    /// * `rows` - Result rows
    pub async fn render(&self, question: &str, executed: &TranslatedQuery, rows: &[Row]) -> Answer {
        if rows.is_empty() {
            return Answer {
                text: no_results_message(&executed.query),
                source: AnswerSource::NoResults,
                fallback_reason: None,
            };
        }

        match self.synthesize(question, executed, rows).await {
            Ok(text) => Answer {
                text,
                source: AnswerSource::Generated,
                fallback_reason: None,
            },
            Err(e) => {
                warn!(error = %e, "falling back to templated answer");
                Answer {
                    text: template_answer(&executed.query, rows),
                    source: AnswerSource::Template,
                    fallback_reason: Some(e),
                }
            }
        }
    }

    /// Generate prose for non-empty rows and check it against the content contract.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::SynthesisError` if generation fails, times out,
    /// or the text violates the contract
    pub async fn synthesize(&self, question: &str, executed: &TranslatedQuery, rows: &[Row]) -> Result<String> {
        let contract = ContentContract::from_rows(rows);
        let prompt = synthesis_prompt(question, executed, rows, &contract)?;

        let span = llm_span(LlmPurpose::Synthesize, self.generator.model(), 1);
        let text = async {
            match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
                Ok(Ok(text)) => {
                    record_llm_metrics(text.chars().count());
                    Ok(text)
                }
                Ok(Err(e)) => Err(GraphRagError::synthesis(format!("text generation failed: {}", e))),
                Err(_) => Err(GraphRagError::synthesis(format!(
                    "text generation timed out after {:?}",
                    self.timeout
                ))),
            }
        }
        .instrument(span)
        .await?;

        let text = text.trim().to_string();
        contract.check(&text)?;
        Ok(text)
    }
}

fn synthesis_prompt(
    question: &str,
    executed: &TranslatedQuery,
    rows: &[Row],
    contract: &ContentContract,
) -> Result<Prompt> {
    let system = "You explain query results from a travel and accommodation graph.\n\
        Rules:\n\
        1. Enumerate every relationship found, one by one.\n\
        2. For stays give the hotel, city, check-in date, duration and room details.\n\
        3. For trips give the destination, date, company or airline and fare.\n\
        4. Write every name and date exactly as it appears in the results.\n\
        5. Answer in the language of the question. Do not invent facts.";
    let user = format!(
        "Question: {}\n\nExecuted query:\n{}\n\nResults:\n{}\n\nThe answer must mention: {}",
        question,
        executed.rendered(),
        serde_json::to_string_pretty(rows)?,
        contract.required.join(", ")
    );
    Ok(Prompt::text(system, user))
}

/// Fixed answer for an empty result.
pub fn no_results_message(query: &PatternQuery) -> String {
    let pattern = PatternCatalog.get(query.pattern);
    format!(
        "No relationship found between \"{}\" and \"{}\". The {} search ({}) returned no records. \
         Check the spelling of both names or ask about a different kind of relationship.",
        query.name1,
        query.name2,
        query.pattern,
        pattern.description.trim_end_matches('.').to_lowercase()
    )
}

/// Deterministic rendering of result rows.
pub fn template_answer(query: &PatternQuery, rows: &[Row]) -> String {
    let mut out = format!(
        "Found {} result(s) for {} between \"{}\" and \"{}\":",
        rows.len(),
        query.pattern,
        query.name1,
        query.name2
    );
    for row in rows {
        out.push_str("\n- ");
        out.push_str(&match query.pattern {
            PatternId::RelationshipPath => format!(
                "{} -> {} ({})",
                text(row.get("relationship")),
                text(row.get("endpoint")),
                details(row.get("details"))
            ),
            PatternId::SharedDestination => format!(
                "{}: {}: {}; {}: {}",
                text(row.get("city")),
                query.name1,
                list(row.get("trips1"), trip),
                query.name2,
                list(row.get("trips2"), trip)
            ),
            PatternId::SharedHotel => format!(
                "{} ({}): {}: {}; {}: {}",
                text(row.get("hotel")),
                list(row.get("cities"), |v| text(Some(v))),
                query.name1,
                list(row.get("stays1"), |v| details(Some(v))),
                query.name2,
                list(row.get("stays2"), |v| details(Some(v)))
            ),
        });
    }
    out
}

fn text(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => "?".to_string(),
        Some(other) => other.to_string(),
    }
}

/// `key: value` pairs of a property map.
fn details(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, text(Some(v))))
            .collect::<Vec<_>>()
            .join(", "),
        other => text(other),
    }
}

fn trip(value: &JsonValue) -> String {
    format!("{} [{}]", text(value.get("relationship")), details(value.get("details")))
}

fn list(value: Option<&JsonValue>, render: impl Fn(&JsonValue) -> String) -> String {
    match value {
        Some(JsonValue::Array(items)) if !items.is_empty() => {
            items.iter().map(render).collect::<Vec<_>>().join(" | ")
        }
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(value: JsonValue) -> Row {
        serde_json::from_value(value).unwrap()
    }

    fn hotel_rows() -> Vec<Row> {
        vec![row(json!({
            "hotel": "Grand Otel",
            "cities": ["İstanbul"],
            "stays1": [{"check_in": "2023-06-15", "duration": 3, "room_type": "Deluxe"}],
            "stays2": [{"check_in": "2023-06-16", "duration": 2, "room_type": "Standard"}]
        }))]
    }

    fn executed(pattern: PatternId) -> TranslatedQuery {
        let query = PatternCatalog.instantiate(pattern, "Ali Veli", "Ayşe Kaya", 10);
        TranslatedQuery {
            statement: query.to_statement(),
            query,
            reasoning: String::new(),
            attempts: 1,
        }
    }

    #[test]
    fn test_contract_collects_places_and_dates() {
        let contract = ContentContract::from_rows(&hotel_rows());
        assert_eq!(contract.required, vec!["Grand Otel", "2023-06-15", "2023-06-16"]);
        assert_eq!(contract.missing("grand otel on 2023-06-15"), vec!["2023-06-16"]);
        assert!(contract.check("   ").is_err());
    }

    #[test]
    fn test_template_satisfies_contract() {
        let rows = vec![
            row(json!({"city": "İstanbul",
                "trips1": [{"relationship": "FLEW", "details": {"flight_date": "2024-03-01", "airline": "THY"}}],
                "trips2": [{"relationship": "TOOK_BUS", "details": {"travel_date": "2024-03-02", "company": "Metro"}}]})),
        ];
        let query = executed(PatternId::SharedDestination).query;
        let text = template_answer(&query, &rows);
        assert!(ContentContract::from_rows(&rows).check(&text).is_ok());
        assert!(text.contains("FLEW"));
        assert!(text.contains("TOOK_BUS"));
    }

    #[tokio::test]
    async fn test_empty_rows_skip_generator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let generator = move |_: &Prompt| -> Result<String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("unused".to_string())
        };
        let synthesizer = AnswerSynthesizer::new(Arc::new(generator), Duration::from_secs(1));
        let answer = synthesizer.render("?", &executed(PatternId::SharedHotel), &[]).await;

        assert_eq!(answer.source, AnswerSource::NoResults);
        assert!(answer.text.contains("Ali Veli"));
        assert!(answer.text.contains("shared_hotel"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_contract_violation_falls_back_to_template() {
        let generator = |_: &Prompt| -> Result<String> { Ok("They stayed at Grand Otel.".to_string()) };
        let synthesizer = AnswerSynthesizer::new(Arc::new(generator), Duration::from_secs(1));
        let answer = synthesizer
            .render("nerede kaldılar?", &executed(PatternId::SharedHotel), &hotel_rows())
            .await;

        assert_eq!(answer.source, AnswerSource::Template);
        assert!(matches!(answer.fallback_reason, Some(GraphRagError::SynthesisError(_))));
        assert!(answer.text.contains("Grand Otel"));
        assert!(answer.text.contains("2023-06-16"));
    }

    #[tokio::test]
    async fn test_compliant_prose_is_used() {
        let generator = |prompt: &Prompt| -> Result<String> {
            assert!(prompt.user.contains("must mention: Grand Otel, 2023-06-15, 2023-06-16"));
            Ok("Ali Veli checked in to Grand Otel on 2023-06-15 and Ayşe Kaya on 2023-06-16.".to_string())
        };
        let synthesizer = AnswerSynthesizer::new(Arc::new(generator), Duration::from_secs(1));
        let answer = synthesizer
            .render("?", &executed(PatternId::SharedHotel), &hotel_rows())
            .await;
        assert_eq!(answer.source, AnswerSource::Generated);
    }
}
