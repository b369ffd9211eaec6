//! Embedding configuration.

use qa_core::{AppConfig, ProviderKind};

/// Dimensions produced by the offline mock provider.
pub const MOCK_DIMENSIONS: usize = 256;

/// Settings needed to build an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "dashscope" or "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub api_base: String,

    pub api_key: Option<String>,

    /// Vector length for providers that choose it locally
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "hashed-trigram".to_string(),
            api_base: ProviderKind::DashScope.default_api_base().to_string(),
            api_key: None,
            dimensions: MOCK_DIMENSIONS,
        }
    }
}

impl EmbeddingConfig {
    /// Derive embedding settings from the application configuration.
    ///
    /// Embeddings always go to DashScope, whichever chat provider is active.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            provider: config.rag.embedding_provider.clone(),
            model: config.rag.embedding_model.clone(),
            api_base: config.dashscope.api_base.clone(),
            api_key: config.dashscope.api_key.clone(),
            dimensions: MOCK_DIMENSIONS,
        }
    }
}
