//! Text generation instrumentation.

use tracing::{field, span, Level, Span};

/// Why the text generation service is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmPurpose {
    /// Question to pattern selection
    Translate,
    /// Rows to answer text
    Synthesize,
}

impl LlmPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Synthesize => "synthesize",
        }
    }
}

/// Create a span for one text generation request.
pub fn llm_span(purpose: LlmPurpose, model: &str, attempt: u32) -> Span {
    span!(
        Level::INFO,
        "gen_ai",
        otel.name = %format!("chat {}", model),
        otel.kind = "client",
        gen_ai.operation.name = "chat",
        gen_ai.request.model = model,
        purpose = purpose.as_str(),
        attempt = attempt,
        gen_ai.response.chars = field::Empty,
    )
}

/// Record the response size on the current span.
pub fn record_llm_metrics(response_chars: usize) {
    Span::current().record("gen_ai.response.chars", response_chars);
}
