//! Shared application state.

use std::sync::Arc;

use qa_core::{AppConfig, AppError, AppResult};
use qa_knowledge::VectorStore;
use qa_llm::LlmClient;

/// State handed to every handler.
///
/// Built once at startup. The vector store is `None` when RAG is disabled.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm: Arc<dyn LlmClient>,
    pub vectors: Option<Arc<dyn VectorStore>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LlmClient>,
        vectors: Option<Arc<dyn VectorStore>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            llm,
            vectors,
        }
    }

    /// Build the chat client and vector store described by `config`.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let llm = qa_llm::create_client(&config)?;
        let vectors = qa_knowledge::open_vector_store(&config).await?;
        Ok(Self::new(config, llm, vectors))
    }

    /// The vector store, or a `Validation` error when RAG is disabled.
    pub fn vector_store(&self) -> AppResult<&Arc<dyn VectorStore>> {
        self.vectors.as_ref().ok_or_else(|| {
            AppError::Validation("Vector store is disabled. Set RAG_ENABLED=true".to_string())
        })
    }
}
