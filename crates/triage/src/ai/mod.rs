//! Language model integration.
//!
//! - Provider abstraction with Anthropic and OpenAI implementations
//! - [`ModelClient`], the single-prompt entry point used by classification
//! - Strict JSON extraction from model replies

pub mod anthropic;
pub mod client;
pub mod openai;
pub mod provider;

use std::sync::Arc;

use crate::config::AiConfig;
use crate::errors::{TriageError, TriageResult};

pub use anthropic::AnthropicProvider;
pub use client::ModelClient;
pub use openai::OpenAIProvider;
pub use provider::{
    parse_ai_response, AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, TokenUsage,
};

/// Build the provider named in configuration.
pub fn provider_from_config(config: &AiConfig) -> TriageResult<Arc<dyn AIProvider>> {
    let key = config
        .api_key
        .clone()
        .ok_or_else(|| TriageError::Config(vec![format!("No API key for '{}'", config.provider)]))?;

    let provider: Arc<dyn AIProvider> = match config.provider.as_str() {
        "anthropic" => {
            let mut p = AnthropicProvider::new(key);
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "openai" => {
            let mut p = OpenAIProvider::new(key);
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        other => {
            return Err(TriageError::Config(vec![format!(
                "Unknown AI provider '{other}'"
            )]))
        }
    };

    tracing::debug!(provider = provider.name(), model = %config.model, "AI provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_provider_by_name() {
        let config = AiConfig {
            provider: "openai".into(),
            api_key: Some("k".into()),
            ..Default::default()
        };
        assert_eq!(provider_from_config(&config).unwrap().name(), "openai");
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let config = AiConfig {
            provider: "mystery".into(),
            api_key: Some("k".into()),
            ..Default::default()
        };
        let err = provider_from_config(&config).err().unwrap();
        assert_eq!(err.exit_code(), 5);
    }
}
