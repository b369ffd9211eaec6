//! Question answering endpoint.

use axum::extract::State;
use axum::Json;
use qa_core::AppError;
use qa_knowledge::rag::{merge_context, retrieve_context, should_use_rag};
use qa_llm::LlmRequest;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,

    /// Optional background material from the caller
    #[serde(default)]
    pub context: Option<String>,

    /// Echoed back unchanged
    #[serde(default)]
    pub session_id: Option<String>,

    /// Accepted for compatibility; answers are never streamed
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub session_id: Option<String>,
}

/// `POST /api/qa/ask`
pub async fn ask(
    State(state): State<AppState>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()).into());
    }

    if body.stream == Some(true) {
        tracing::debug!("Streaming requested; returning a single answer");
    }

    let caller_context = body.context.as_deref().filter(|c| !c.is_empty());
    let context = resolve_context(&state, question, caller_context).await;

    tracing::info!(
        question_chars = question.chars().count(),
        context_chars = context.as_ref().map(|c| c.chars().count()).unwrap_or(0),
        "Answering question"
    );

    let request = LlmRequest::new(question, state.config.model.as_str()).with_context(context);
    let response = state.llm.complete(&request).await?;

    Ok(Json(AskResponse {
        answer: response.content,
        session_id: body.session_id,
    }))
}

/// Caller context, extended with retrieved snippets for in-domain questions.
///
/// Retrieval failures never fail the request: the caller's context is used
/// as-is instead.
async fn resolve_context(
    state: &AppState,
    question: &str,
    caller_context: Option<&str>,
) -> Option<String> {
    let Some(store) = state.vectors.as_ref() else {
        return caller_context.map(str::to_string);
    };

    if !should_use_rag(question) {
        return caller_context.map(str::to_string);
    }

    match retrieve_context(store.as_ref(), question, state.config.rag.top_k).await {
        Ok(rag) => merge_context(caller_context, rag),
        Err(e) => {
            tracing::warn!(error = %e, "Retrieval failed; answering without retrieved context");
            caller_context.map(str::to_string)
        }
    }
}
