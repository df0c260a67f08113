//! AI Provider trait and common types.
//!
//! Defines the interface that all AI providers must implement.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::{TriageError, TriageResult};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIRole {
    /// User message (input)
    User,
    /// Assistant message (AI response)
    Assistant,
}

impl AIRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AIRole::User => "user",
            AIRole::Assistant => "assistant",
        }
    }
}

/// A message in a conversation with an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIMessage {
    /// Role of the message sender
    pub role: AIRole,
    /// Content of the message
    pub content: String,
}

impl AIMessage {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::User,
            content: content.into(),
        }
    }
}

/// Token usage information from an AI response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIResponse {
    /// Generated text content
    pub text: String,
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Options for text generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// Trait for AI providers.
///
/// All AI providers (Anthropic, OpenAI, etc.) must implement this trait.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Get the provider name (e.g., "anthropic", "openai").
    fn name(&self) -> &'static str;

    /// Generate text from messages.
    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        options: &GenerateOptions,
    ) -> TriageResult<AIResponse>;
}

/// Parse a model's text output as JSON.
///
/// Strips a surrounding markdown code fence if present. Anything else that
/// is not valid JSON for `T` is a parse error; no repair is attempted.
pub fn parse_ai_response<T: for<'de> Deserialize<'de>>(text: &str) -> TriageResult<T> {
    let text = text.trim();

    let json_text = if text.starts_with("```json") {
        text.strip_prefix("```json")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else if text.starts_with("```") {
        text.strip_prefix("```")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else {
        text
    };

    serde_json::from_str(json_text).map_err(|e| TriageError::AiResponseParse {
        reason: format!("{e}. Response: {text}"),
    })
}

/// Map a failed provider HTTP status onto a retryable or terminal error.
pub(crate) fn status_error(provider: &str, status: StatusCode, detail: &str) -> TriageError {
    let message = format!("{provider} API error ({status}): {detail}");
    // includes Anthropic's 529 "overloaded"
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        TriageError::ModelUnavailable(message)
    } else {
        TriageError::Ai(message)
    }
}

/// Map a transport failure; timeouts and refused connections are retryable.
pub(crate) fn transport_error(provider: &str, e: &reqwest::Error) -> TriageError {
    let message = format!("{provider} API request failed: {e}");
    if e.is_timeout() || e.is_connect() {
        TriageError::ModelUnavailable(message)
    } else {
        TriageError::Ai(message)
    }
}
