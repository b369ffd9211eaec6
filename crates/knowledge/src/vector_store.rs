//! Vector store abstraction for document chunks.
//!
//! Defines a trait for provider-agnostic chunk storage and similarity search.

use std::collections::HashSet;

use qa_core::{AppError, AppResult};

use crate::types::{Metadata, RetrievalResult};

/// Trait for vector store backends.
///
/// The collection is append-only: there is no update or delete.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and insert a batch of texts.
    ///
    /// The whole batch is rejected, with nothing inserted, when the arrays
    /// differ in length, an id repeats inside the batch (`Validation`) or an
    /// id is already stored (`Conflict`). Returns the inserted count.
    async fn add(
        &self,
        ids: &[String],
        texts: &[String],
        metadatas: Option<&[Metadata]>,
    ) -> AppResult<usize>;

    /// Return up to `k` chunks closest to `query`, ascending by distance.
    ///
    /// An empty collection yields an empty vec. `k == 0` is a `Validation` error.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<RetrievalResult>>;

    /// Number of stored chunks.
    async fn count(&self) -> AppResult<usize>;
}

/// Validate an add batch before anything is embedded or written.
pub fn validate_batch(
    ids: &[String],
    texts: &[String],
    metadatas: Option<&[Metadata]>,
) -> AppResult<()> {
    if ids.len() != texts.len() {
        return Err(AppError::Validation(format!(
            "ids and texts must have the same length ({} != {})",
            ids.len(),
            texts.len()
        )));
    }

    if let Some(metadatas) = metadatas {
        if metadatas.len() != ids.len() {
            return Err(AppError::Validation(format!(
                "metadatas must have the same length as ids ({} != {})",
                metadatas.len(),
                ids.len()
            )));
        }

        for (metadata, id) in metadatas.iter().zip(ids) {
            if let Some((key, _)) = metadata
                .iter()
                .find(|(_, value)| value.is_array() || value.is_object())
            {
                return Err(AppError::Validation(format!(
                    "metadata '{}' of '{}' must be a string, number, boolean or null",
                    key, id
                )));
            }
        }
    }

    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if id.is_empty() {
            return Err(AppError::Validation("ids must not be empty".to_string()));
        }
        if !seen.insert(id.as_str()) {
            return Err(AppError::Validation(format!("duplicate id in batch: {}", id)));
        }
    }

    Ok(())
}
