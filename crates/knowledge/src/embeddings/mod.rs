//! Embedding providers.
//!
//! Turns text into fixed-length vectors, either through a remote
//! OpenAI-compatible API or a local deterministic hash.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockProvider, OpenAiEmbeddingProvider};
