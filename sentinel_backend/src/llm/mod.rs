pub mod local;
pub mod remote;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{BackendError, ConfigError};
use crate::models::ChatMessage;

pub use local::LocalServerBackend;
pub use remote::RemoteChatBackend;

/// A text-generation service that turns a chat transcript into a reply.
///
/// Implementations hold a single client and are not meant to be shared between
/// independent reporting loops.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Human-readable backend name, used in logs
    fn name(&self) -> &str;

    /// Model identifier sent with every request
    fn model(&self) -> &str;

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;
}

/// The closed set of supported backends, chosen once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted OpenAI-compatible chat-completion API
    RemoteChat,
    /// Locally running model server (Ollama)
    LocalServer,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "remote" => Ok(BackendKind::RemoteChat),
            "ollama" | "local" => Ok(BackendKind::LocalServer),
            other => Err(ConfigError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Fixed sampling parameters; low temperature keeps reports stable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    sampling: SamplingParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }
}

/// Build the configured backend, rejecting incomplete configuration up front.
pub fn build_backend(config: &LlmConfig) -> Result<Box<dyn ModelBackend>, ConfigError> {
    let kind: BackendKind = config.backend.parse()?;
    let timeout = Duration::from_secs(config.timeout_secs);
    let backend: Box<dyn ModelBackend> = match kind {
        BackendKind::RemoteChat => Box::new(RemoteChatBackend::new(
            config
                .api_url
                .clone()
                .unwrap_or_else(|| remote::DEFAULT_API_URL.to_string()),
            config.api_key.clone(),
            config.model.clone(),
            timeout,
        )?),
        BackendKind::LocalServer => Box::new(LocalServerBackend::new(
            config
                .api_url
                .clone()
                .unwrap_or_else(|| local::DEFAULT_API_URL.to_string()),
            config.model.clone(),
            timeout,
        )?),
    };
    tracing::info!("Using {} backend with model {}", backend.name(), backend.model());
    Ok(backend)
}

fn require_model(model: Option<String>, backend: &'static str) -> Result<String, ConfigError> {
    model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or(ConfigError::MissingModel { backend })
}

fn map_send_error(error: reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Request(error)
    }
}

/// Turn a non-2xx response into a `BackendError`, keeping the body for debugging.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read body".to_string());
    Err(BackendError::Status { status, body })
}
