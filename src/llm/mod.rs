//! Text generation: the injected capability, the hosted-model client, the
//! question translator and the answer synthesizer.

pub mod client;
pub mod planner;
pub mod synthesizer;

pub use client::{strip_markdown, LlmClient, LlmProvider, Prompt, TextGenerator};
pub use planner::{QueryPlanner, TranslatedQuery};
pub use synthesizer::{Answer, AnswerSource, AnswerSynthesizer, ContentContract};
