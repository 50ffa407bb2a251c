//! Text generation capability and its HTTP implementation.

use crate::config::LlmConfig;
use crate::types::{GraphRagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// A single text generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Instructions and grounding context
    pub system: String,
    /// The concrete request
    pub user: String,
    /// Ask the provider for a JSON object response
    pub json_output: bool,
}

impl Prompt {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json_output: false,
        }
    }

    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            json_output: true,
            ..Self::text(system, user)
        }
    }
}

/// Opaque text generation service.
///
/// Implemented by [`LlmClient`] and by any `Fn(&Prompt) -> Result<String>`,
/// which is how tests supply deterministic doubles.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails or is unreachable
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Model name reported on spans.
    fn model(&self) -> &str {
        "local"
    }
}

#[async_trait]
impl<F> TextGenerator for F
where
    F: Fn(&Prompt) -> Result<String> + Send + Sync,
{
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self(prompt)
    }
}

/// Text generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
    Cerebras,
}

impl LlmProvider {
    /// Provider for a model name.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") || model.starts_with("anthropic") {
            Self::Anthropic
        } else if model.starts_with("cerebras") || model.starts_with("llama") || model.starts_with("qwen") {
            Self::Cerebras
        } else {
            Self::OpenAI
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Cerebras => "CEREBRAS_API_KEY",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1/chat/completions",
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::Cerebras => "https://api.cerebras.ai/v1/chat/completions",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Cerebras => "Cerebras",
        }
    }
}

/// Chat completion response (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Anthropic messages response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

/// HTTP client for hosted chat models.
pub struct LlmClient {
    api_key: String,
    model: String,
    provider: LlmProvider,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl LlmClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::ConfigError` if no API key is configured for the model
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            GraphRagError::ConfigError(format!(
                "{} environment variable not set",
                config.api_key_var()
            ))
        })?;
        let provider = LlmProvider::for_model(&config.model);
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            provider,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| provider.default_endpoint().to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Model name as sent to the provider.
    fn wire_model(&self) -> &str {
        self.model.strip_prefix("cerebras:").unwrap_or(&self.model)
    }

    /// Call an OpenAI-compatible chat completions endpoint (OpenAI, Cerebras).
    async fn call_chat(&self, prompt: &Prompt) -> Result<String> {
        let mut body = json!({
            "model": self.wire_model(),
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });
        if prompt.json_output {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GraphRagError::LlmError(format!(
                "{} API error {}: {}",
                self.provider.name(),
                status,
                body
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            GraphRagError::LlmError(format!("Failed to parse {} response: {}", self.provider.name(), e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GraphRagError::LlmError(format!("No response from {}", self.provider.name())))
    }

    /// Call the Anthropic messages endpoint.
    async fn call_anthropic(&self, prompt: &Prompt) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": prompt.system,
                "messages": [
                    {"role": "user", "content": prompt.user}
                ],
                "temperature": self.temperature
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GraphRagError::LlmError(format!("Anthropic API error {}: {}", status, body)));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| GraphRagError::LlmError(format!("Failed to parse Anthropic response: {}", e)))?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| GraphRagError::LlmError("No response from Anthropic".to_string()))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let text = match self.provider {
            LlmProvider::OpenAI | LlmProvider::Cerebras => self.call_chat(prompt).await?,
            LlmProvider::Anthropic => self.call_anthropic(prompt).await?,
        };
        debug!(provider = self.provider.name(), chars = text.len(), "text generated");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Strip a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
pub fn strip_markdown(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let start = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    let body = &text[start..];
    let end = body.rfind("```").unwrap_or(body.len());
    body[..end].trim()
}
