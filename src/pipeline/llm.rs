//! Model interaction: one prompt in, one text completion out.
//!
//! The analyst talks to a [`TextGenerator`]; [`LlmGenerator`] is the
//! implementation backed by an `edgequake_llm` provider. Prompt wording lives
//! in [`crate::prompts`] so this module only deals with transport, timeouts
//! and retries.
//!
//! ## Retry Strategy
//!
//! Rate-limit and overload errors are transient. Failed calls are retried
//! with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`): with a
//! 500 ms base and 2 retries the waits are 500 ms then 1 s. A call that hits
//! the per-call timeout is retried the same way.

use crate::config::InsightsConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Optional system instruction sent ahead of the prompt.
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A completed generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError>;
}

/// [`TextGenerator`] over an `edgequake_llm` provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &InsightsConfig) -> Self {
        Self {
            provider,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let start = Instant::now();
        let messages = build_messages(request);
        let options = build_options(request);
        let call_timeout = Duration::from_secs(self.api_timeout_secs);

        let mut last_err: Option<GenerationError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "LLM retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(call_timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(Generation {
                        text: response.content,
                        input_tokens: response.prompt_tokens,
                        output_tokens: response.completion_tokens,
                    });
                }
                Ok(Err(e)) => {
                    let detail = e.to_string();
                    warn!("LLM attempt {} failed — {}", attempt + 1, detail);
                    last_err = Some(GenerationError::Failed {
                        retries: self.max_retries,
                        detail,
                    });
                }
                Err(_) => {
                    warn!(
                        "LLM attempt {} timed out after {}s",
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_err = Some(GenerationError::Timeout {
                        secs: self.api_timeout_secs,
                    });
                }
            }
        }

        Err(last_err.unwrap_or(GenerationError::Failed {
            retries: self.max_retries,
            detail: "Unknown error".to_string(),
        }))
    }
}

/// Wait before retry `attempt` (1-based), saturating instead of overflowing
/// for large retry counts.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor)
}

fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(&request.prompt));
    messages
}

fn build_options(request: &GenerationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            system: system.map(str::to_string),
            prompt: "Summarise this".into(),
            temperature: 0.5,
            max_tokens: 8192,
        }
    }

    #[test]
    fn build_options_from_request() {
        let opts = build_options(&request(None));
        assert_eq!(opts.temperature, Some(0.5));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
    }

    #[test]
    fn backoff_saturates_for_large_attempts() {
        assert_eq!(backoff_ms(500, 64), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
        assert_eq!(backoff_ms(0, 100), 0);
    }

    #[test]
    fn system_message_only_when_present() {
        assert_eq!(build_messages(&request(None)).len(), 1);
        assert_eq!(build_messages(&request(Some(""))).len(), 1);
        assert_eq!(build_messages(&request(Some("You are an analyst"))).len(), 2);
    }
}
