use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    ensure_success, map_send_error, require_model, Choice, ChatRequest, ModelBackend,
    ResponseMessage, SamplingParams,
};
use crate::error::{BackendError, ConfigError};
use crate::http_client::build_http_client_with_timeout;
use crate::models::ChatMessage;

pub const DEFAULT_API_URL: &str = "http://localhost:11434/api/chat";

/// Ollama answers with a single `message`; OpenAI-compatible local servers with `choices`.
#[derive(Debug, Deserialize)]
struct LocalChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Model server running on a locally configured URL.
pub struct LocalServerBackend {
    api_url: String,
    model: String,
    sampling: SamplingParams,
    timeout: Duration,
    client: reqwest::Client,
}

impl LocalServerBackend {
    pub fn new(
        api_url: String,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let model = require_model(model, "ollama")?;
        if api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "llm.api_url",
                reason: "local server URL is empty".to_string(),
            });
        }

        Ok(Self {
            api_url,
            model,
            sampling: SamplingParams::default(),
            timeout,
            client: build_http_client_with_timeout(Some(timeout))?,
        })
    }
}

#[async_trait]
impl ModelBackend for LocalServerBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        tracing::info!("Generating report with Ollama {}", self.model);

        let request = ChatRequest {
            model: &self.model,
            messages,
            sampling: self.sampling,
            stream: Some(false),
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let reply: LocalChatResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::MalformedResponse(e.to_string())
                }
            })?;

        let content = match reply.message {
            Some(message) => message.content,
            None => reply
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        };

        // A missing content field reads as an empty reply; validation decides what to do with it.
        Ok(content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, timeout: Duration) -> LocalServerBackend {
        LocalServerBackend::new(
            format!("{}/api/chat", server.uri()),
            Some("llama3.2".to_string()),
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn rejects_missing_model() {
        assert!(matches!(
            LocalServerBackend::new(DEFAULT_API_URL.to_string(), None, Duration::from_secs(30)),
            Err(ConfigError::MissingModel { backend: "ollama" })
        ));
    }

    #[tokio::test]
    async fn reads_ollama_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.2",
                "stream": false,
                "max_tokens": 2000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.2",
                "message": {"role": "assistant", "content": "Local report text"},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = backend_for(&server, Duration::from_secs(5))
            .generate(&[ChatMessage::user("alerts")])
            .await
            .unwrap();
        assert_eq!(text, "Local report text");
    }

    #[tokio::test]
    async fn accepts_openai_shaped_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "compatible server reply"}}]
            })))
            .mount(&server)
            .await;

        let text = backend_for(&server, Duration::from_secs(5))
            .generate(&[ChatMessage::user("alerts")])
            .await
            .unwrap();
        assert_eq!(text, "compatible server reply");
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"message": {"content": "too late"}})),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server, Duration::from_millis(200))
            .generate(&[ChatMessage::user("alerts")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
    }

    #[tokio::test]
    async fn server_error_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = backend_for(&server, Duration::from_secs(5))
            .generate(&[ChatMessage::user("alerts")])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 500, .. }));
    }
}
