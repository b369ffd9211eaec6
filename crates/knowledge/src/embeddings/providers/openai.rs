//! OpenAI-compatible embeddings provider.
//!
//! Calls `POST {api_base}/embeddings` with `{model, input}` and reads
//! `data[].embedding`. DashScope compatible mode is the default endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::embeddings::provider::EmbeddingProvider;
use qa_core::{AppError, AppResult};

/// Request timeout for embedding calls.
pub const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Embedding client for an OpenAI-compatible endpoint.
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: &str,
        model: &str,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(EMBEDDING_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }
}

/// Check count and order of returned embeddings.
fn into_vectors(response: EmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(AppError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }

    response
        .data
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item.index {
            Some(index) if index != position => Err(AppError::Embedding(format!(
                "Embedding at position {} has index {}",
                position, index
            ))),
            _ => Ok(item.embedding),
        })
        .collect()
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            provider = %self.name,
            model = %self.model,
            batch_size = texts.len(),
            "Requesting embeddings"
        );

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to reach {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        into_vectors(body, texts.len())
    }
}
