//! Retrieval step of the ask path.

use qa_core::AppResult;

use crate::rag::context::build_rag_context;
use crate::vector_store::VectorStore;

/// Search the store for `question` and format the hits as context.
///
/// `Ok(None)` means nothing was retrieved. Errors are returned as-is; the
/// caller decides whether to fall back to its own context.
pub async fn retrieve_context(
    store: &dyn VectorStore,
    question: &str,
    k: usize,
) -> AppResult<Option<String>> {
    let results = store.search(question, k).await?;

    tracing::debug!(
        k,
        hits = results.len(),
        best_distance = results.first().map(|r| r.distance),
        "Retrieved context"
    );

    Ok(build_rag_context(&results))
}
