//! Single-prompt model client with retry.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AiConfig;
use crate::errors::TriageResult;
use crate::retry::RetryPolicy;

use super::provider::{AIMessage, AIProvider, GenerateOptions};

/// Sends one prompt at a time and returns the raw text reply.
///
/// No conversation state is kept between calls. Transient provider failures
/// are retried according to the configured [`RetryPolicy`].
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn AIProvider>,
    model: String,
    options: GenerateOptions,
    retry: RetryPolicy,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn AIProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            options: GenerateOptions {
                temperature: Some(0.3),
                max_tokens: Some(1000),
            },
            retry: RetryPolicy::new(3, Duration::from_millis(2000)),
        }
    }

    /// Build from configuration, taking model, sampling options and retry budget.
    pub fn from_config(provider: Arc<dyn AIProvider>, config: &AiConfig) -> Self {
        Self::new(provider, config.model.clone())
            .with_options(GenerateOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
            })
            .with_retry(RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.initial_backoff_ms),
            ))
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message.
    pub async fn complete(&self, prompt: &str) -> TriageResult<String> {
        let messages = [AIMessage::user(prompt)];
        let response = self
            .retry
            .run("model_call", || {
                self.provider
                    .generate_text(&self.model, &messages, &self.options)
            })
            .await?;

        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            tokens = response.usage.total_tokens,
            "Model call complete"
        );
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{AIResponse, TokenUsage};
    use crate::errors::TriageError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails with the queued errors, then answers "ok".
    struct Flaky {
        failures: Mutex<Vec<TriageError>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AIProvider for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn generate_text(
            &self,
            model: &str,
            messages: &[AIMessage],
            _options: &GenerateOptions,
        ) -> TriageResult<AIResponse> {
            self.prompts.lock().unwrap().push(messages[0].content.clone());
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            Ok(AIResponse {
                text: "ok".into(),
                usage: TokenUsage::default(),
                model: model.into(),
                provider: "flaky".into(),
            })
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let provider = Arc::new(Flaky {
            failures: Mutex::new(vec![TriageError::ModelUnavailable("503".into())]),
            prompts: Mutex::new(Vec::new()),
        });
        let client = ModelClient::new(provider.clone(), "m")
            .with_retry(RetryPolicy::new(3, Duration::ZERO));

        assert_eq!(client.complete("hello").await.unwrap(), "ok");
        assert_eq!(provider.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn terminal_failure_returns_immediately() {
        let provider = Arc::new(Flaky {
            failures: Mutex::new(vec![TriageError::Ai("400".into())]),
            prompts: Mutex::new(Vec::new()),
        });
        let client = ModelClient::new(provider.clone(), "m")
            .with_retry(RetryPolicy::new(3, Duration::ZERO));

        assert!(client.complete("hello").await.is_err());
        assert_eq!(provider.prompts.lock().unwrap().as_slice(), ["hello"]);
    }
}
