use std::time::Duration;

use async_trait::async_trait;

use super::{
    ensure_success, map_send_error, require_model, ChatCompletionResponse, ChatRequest,
    ModelBackend, SamplingParams,
};
use crate::error::{BackendError, ConfigError};
use crate::http_client::build_http_client_with_timeout;
use crate::models::ChatMessage;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Hosted OpenAI-compatible chat-completion endpoint.
pub struct RemoteChatBackend {
    api_url: String,
    api_key: String,
    model: String,
    sampling: SamplingParams,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteChatBackend {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let model = require_model(model, "openai")?;
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredentials { backend: "openai" })?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            sampling: SamplingParams::default(),
            timeout,
            client: build_http_client_with_timeout(Some(timeout))?,
        })
    }
}

#[async_trait]
impl ModelBackend for RemoteChatBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.api_url);
        tracing::info!("Generating report with OpenAI {}", self.model);

        let request = ChatRequest {
            model: &self.model,
            messages,
            sampling: self.sampling,
            stream: None,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let completion: ChatCompletionResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        completion
            .into_content()
            .ok_or_else(|| BackendError::MalformedResponse("no choices in response".to_string()))
    }
}
