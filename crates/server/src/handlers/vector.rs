//! Vector store endpoints.

use axum::extract::State;
use axum::Json;
use qa_knowledge::{AddTextsRequest, AddTextsResponse, SearchRequest, SearchResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/vector/add`
pub async fn add(
    State(state): State<AppState>,
    Json(body): Json<AddTextsRequest>,
) -> Result<Json<AddTextsResponse>, ApiError> {
    let store = state.vector_store()?;

    tracing::debug!(ids = body.ids.len(), texts = body.texts.len(), "Adding texts");
    let count = store
        .add(&body.ids, &body.texts, body.metadatas.as_deref())
        .await?;
    tracing::info!(count, "Added texts to vector store");

    Ok(Json(AddTextsResponse {
        status: "ok".to_string(),
        count,
    }))
}

/// `POST /api/vector/search`
pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let store = state.vector_store()?;
    let results = store.search(&body.query, body.k).await?;

    tracing::debug!(k = body.k, returned = results.len(), "Vector search");
    Ok(Json(SearchResponse { results }))
}
