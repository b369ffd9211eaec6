//! LLM client abstraction and request/response types.
//!
//! This module defines the core abstractions for interacting with
//! chat-completion providers.

use qa_core::AppResult;
use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

/// Sampling temperature used for every answer.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The user question
    pub question: String,

    /// Background material sent as a system message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Model identifier (e.g., "qwen2.5-7b-instruct")
    pub model: String,

    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: f32,
}

impl LlmRequest {
    /// Create a new request with required fields.
    pub fn new(question: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Attach context. Empty or whitespace-only context is treated as absent.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }

    /// Conversation sent to the provider: an optional system message with
    /// the context, then the question.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);

        if let Some(ref context) = self.context {
            messages.push(ChatMessage::system(context.clone()));
        }

        messages.push(ChatMessage::user(self.question.clone()));
        messages
    }
}

/// Chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated answer
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics, when the provider reports them
    #[serde(default)]
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

/// Trait for chat-completion providers.
///
/// Implementations send exactly one request per call. Retries are left to
/// the caller.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "dashscope", "kimi").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    ///
    /// # Errors
    /// - `AppError::Upstream` when the provider answers with a non-200 status
    /// - `AppError::ResponseShape` when the body lacks `choices[0].message.content`
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
