//! Report generation on top of a model backend.
//!
//! Every call composes a system prompt, sends one system and one user message,
//! and retries with linear backoff. A reply that fails validation counts as a
//! failed attempt. Once every attempt is spent the caller gets a
//! [`GenerationOutcome::Failed`] value instead of an error, so a reporting
//! cycle can still persist something.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::error::{BackendError, ConfigError, GenerationFailure, ValidationError};
use crate::llm::ModelBackend;
use crate::models::ChatMessage;
use crate::prompt::{PromptSpec, BASE_SYSTEM_PROMPT};
use crate::schedule::{Sleeper, TokioSleeper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub min_response_chars: usize,
}

/// Upper bound for `[retry] base_delay_secs`.
pub const MAX_BASE_DELAY_SECS: u64 = 86_400;

impl Default for RetryPolicy {
    fn default() -> Self {
        let config = RetryConfig::default();
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_secs(config.base_delay_secs),
            min_response_chars: config.min_response_chars,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Result<Self, ConfigError> {
        if config.base_delay_secs > MAX_BASE_DELAY_SECS {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_secs",
                reason: format!(
                    "{}s exceeds the {}s limit",
                    config.base_delay_secs, MAX_BASE_DELAY_SECS
                ),
            });
        }
        Ok(Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_secs(config.base_delay_secs),
            min_response_chars: config.min_response_chars,
        })
    }

    /// Delay after the 1-based `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated(String),
    Failed(GenerationFailure),
}

impl GenerationOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, GenerationOutcome::Generated(_))
    }

    /// Report text, or the degraded error line when generation failed.
    pub fn into_text(self) -> String {
        match self {
            GenerationOutcome::Generated(text) => text,
            GenerationOutcome::Failed(failure) => {
                format!("[ERROR] Report generation failed: {}", failure.last_error)
            }
        }
    }
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Reject empty and abnormally short replies.
pub fn validate_response(content: &str, min_chars: usize) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = content.chars().count();
    if len < min_chars {
        return Err(ValidationError::TooShort {
            len,
            min: min_chars,
            content: content.to_string(),
        });
    }
    Ok(())
}

pub struct ReportGenerator {
    backend: Box<dyn ModelBackend>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    base_prompt: String,
}

impl ReportGenerator {
    pub fn new(backend: Box<dyn ModelBackend>) -> Self {
        Self {
            backend,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            base_prompt: BASE_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_base_prompt(mut self, base_prompt: impl Into<String>) -> Self {
        self.base_prompt = base_prompt.into();
        self
    }

    pub async fn generate(&self, user_content: &str, custom_prompt: Option<&str>) -> GenerationOutcome {
        let system_prompt = PromptSpec {
            base_prompt: &self.base_prompt,
            extra_instructions: custom_prompt,
        }
        .build();
        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_content),
        ];

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            tracing::info!(
                "Report generation attempt {}/{} via {}",
                attempt,
                max_attempts,
                self.backend.name()
            );

            let error = match self.attempt(&messages).await {
                Ok(text) => return GenerationOutcome::Generated(text),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    "Report generation failed after {} attempts: {}",
                    max_attempts,
                    error
                );
                return GenerationOutcome::Failed(GenerationFailure {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                "Report generation attempt {} failed: {} (retrying in {:?})",
                attempt,
                error,
                delay
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, messages: &[ChatMessage]) -> Result<String, AttemptError> {
        let text = self.backend.generate(messages).await?;
        validate_response(&text, self.policy.min_response_chars)?;
        Ok(text)
    }
}
