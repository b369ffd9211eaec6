//! Knowledge layer of the QA Agent.
//!
//! Provides page extraction, chunking, embeddings, the LanceDB vector store
//! and the retrieval-augmentation helpers used by the ask path.

pub mod chunker;
pub mod embeddings;
pub mod extract;
pub mod ingest;
pub mod lancedb_store;
pub mod rag;
pub mod types;
pub mod vector_store;


// Re-export commonly used types
pub use chunker::{chunk_text, ChunkConfig};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use lancedb_store::LanceDbStore;
pub use types::{
    AddTextsRequest, AddTextsResponse, DocumentChunk, Metadata, RetrievalResult, SearchRequest,
    SearchResponse,
};
pub use vector_store::VectorStore;

use qa_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Open the configured vector store, or `None` when RAG is disabled.
pub async fn open_vector_store(config: &AppConfig) -> AppResult<Option<Arc<dyn VectorStore>>> {
    if !config.rag.enabled {
        tracing::info!("RAG disabled; vector endpoints will reject requests");
        return Ok(None);
    }

    let embedder = create_provider(&EmbeddingConfig::from_app_config(config))?;

    tracing::info!(
        provider = embedder.provider_name(),
        model = embedder.model_name(),
        "Using embedding provider"
    );

    let store = LanceDbStore::open(&config.rag.persist_dir, &config.rag.collection, embedder).await?;
    Ok(Some(Arc::new(store)))
}
