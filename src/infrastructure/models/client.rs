use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::PipelineResult;
use crate::domain::models::{GenerationRequest, GenerationResponse, ModelConfig};
use crate::domain::ports::ModelClient;

use super::errors::ModelApiError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// HTTP client for an OpenAI-style `chat/completions` endpoint.
///
/// A single request per call; there is no retry inside the client. A missing
/// credential is only reported when a request is attempted, so stages that
/// never call the model do not need one.
pub struct ChatCompletionsClient {
    /// Reusable HTTP client with connection pooling
    http_client: ReqwestClient,

    /// Bearer credential
    token: Option<String>,

    /// Variable the credential was looked up in, for messages
    token_env: String,

    /// Base URL (without `/chat/completions`)
    base_url: String,

    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl ChatCompletionsClient {
    /// Create a client, reading the credential from `config.token_env`.
    pub fn from_config(config: &ModelConfig) -> PipelineResult<Self> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty());
        Self::with_token(config, token)
    }

    /// Create a client with an explicit credential.
    pub fn with_token(config: &ModelConfig, token: Option<String>) -> PipelineResult<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(ModelApiError::NetworkError)?;

        Ok(Self {
            http_client,
            token,
            token_env: config.token_env.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_request(
        &self,
        token: &str,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ModelApiError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelApiError::Timeout(self.timeout_secs)
                } else {
                    ModelApiError::NetworkError(e)
                }
            })?;

        let status = response.status();

        // Handle non-success status codes
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(ModelApiError::from_status(status, body));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ModelApiError::Timeout(self.timeout_secs)
            } else {
                ModelApiError::NetworkError(e)
            }
        })?;
        serde_json::from_str(&text).map_err(|e| ModelApiError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, file = %request.file_path))]
    async fn complete(&self, request: &GenerationRequest) -> PipelineResult<GenerationResponse> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ModelApiError::MissingToken(self.token_env.clone()))?;

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(request.system_prompt.clone()),
                ChatMessage::user(request.prompt.clone()),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(prompt_chars = request.prompt.len(), "Sending completion request");

        let response = self.send_request(token, &body).await.inspect_err(|err| {
            warn!(error = %err, transient = err.is_transient(), "Completion request failed");
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelApiError::MalformedResponse("response has no choices".to_string()))?;

        info!(
            response_chars = choice.message.content.len(),
            finish_reason = ?choice.finish_reason,
            "Completion received"
        );

        Ok(GenerationResponse {
            content: choice.message.content,
            model: response.model,
        })
    }
}
