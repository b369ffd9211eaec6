//! LLM integration crate for the QA Agent.
//!
//! This crate provides a provider-agnostic abstraction for chat completions.
//! Every supported provider speaks the OpenAI-compatible API.
//!
//! # Providers
//! - **DashScope**: Alibaba Cloud compatible mode (default)
//! - **Kimi**: Moonshot
//!
//! # Example
//! ```no_run
//! use qa_llm::{LlmClient, LlmRequest, providers::OpenAiCompatClient};
//! use qa_core::ProviderKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiCompatClient::new(
//!     ProviderKind::Kimi,
//!     "https://api.moonshot.cn/v1",
//!     "sk-...",
//! )?;
//! let request = LlmRequest::new("Hello, world!", "kimi-k2-instruct");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiCompatClient;
pub use types::{ChatMessage, Role};
