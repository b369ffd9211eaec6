//! OpenAI-compatible chat completion provider.
//!
//! Both DashScope (compatible mode) and Moonshot Kimi expose
//! `POST /chat/completions` with the OpenAI request and response shapes,
//! so a single client serves both.

use std::time::Duration;

use qa_core::{AppError, AppResult, ProviderKind};
use reqwest::StatusCode;
use serde_json::Value;

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ChatCompletionRequest;

/// Request timeout for chat completions.
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat client for an OpenAI-compatible endpoint.
pub struct OpenAiCompatClient {
    provider: ProviderKind,

    /// Base URL without the trailing slash
    base_url: String,

    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for a provider endpoint.
    pub fn new(
        provider: ProviderKind,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_wire_request<'a>(&self, request: &'a LlmRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: request.messages(),
            temperature: request.temperature,
            stream: false,
        }
    }
}

/// Pull the answer out of a completion body.
///
/// Only `choices[0].message.content` is consulted; usage is optional.
pub fn parse_completion(body: &Value, model: &str) -> AppResult<LlmResponse> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::ResponseShape(format!("missing choices[0].message.content in {}", body))
        })?;

    let usage = body
        .get("usage")
        .and_then(|u| serde_json::from_value::<LlmUsage>(u.clone()).ok())
        .unwrap_or_default();

    Ok(LlmResponse {
        content: content.to_string(),
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(model)
            .to_string(),
        usage,
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            provider = self.provider.as_str(),
            model = %request.model,
            has_context = request.context.is_some(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.to_wire_request(request))
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                body: format!("Failed to reach {}: {}", self.provider.as_str(), e),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::ResponseShape(format!("Failed to read body: {}", e)))?;

        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), "Chat completion failed");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| AppError::ResponseShape(format!("Invalid JSON: {}", e)))?;

        let response = parse_completion(&body, &request.model)?;
        tracing::debug!(
            chars = response.content.len(),
            total_tokens = response.usage.total_tokens,
            "Received chat completion"
        );

        Ok(response)
    }
}
