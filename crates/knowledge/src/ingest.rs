//! Page ingestion: turn fetched text into chunks and push them to the API.

use std::time::Duration;

use qa_core::{AppError, AppResult};
use serde_json::{json, Value};

use crate::chunker::{chunk_with, ChunkConfig};
use crate::types::{AddTextsRequest, DocumentChunk, Metadata};

/// Timeout for the add request; embedding a large page can be slow.
pub const POST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default API server address.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Metadata shared by every chunk of a page.
///
/// `host` keeps an explicit port, matching the URL's network location.
pub fn page_metadata(url: &str) -> Metadata {
    let (host, path) = match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let host = match (parsed.host_str(), parsed.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            (host, parsed.path().to_string())
        }
        Err(_) => (String::new(), String::new()),
    };

    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!("url"));
    metadata.insert("url".to_string(), json!(url));
    metadata.insert("host".to_string(), json!(host));
    metadata.insert("path".to_string(), json!(path));
    metadata
}

/// Chunk page text, giving each chunk a fresh UUID and its position.
pub fn build_chunks(url: &str, text: &str, config: ChunkConfig) -> Vec<DocumentChunk> {
    let base = page_metadata(url);

    chunk_with(text, config)
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let mut metadata = base.clone();
            metadata.insert("chunk".to_string(), json!(i));
            DocumentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                text: part.to_string(),
                metadata,
            }
        })
        .collect()
}

/// Client for the vector endpoints of a running API server.
pub struct VectorApiClient {
    api_base: String,
    client: reqwest::Client,
}

impl VectorApiClient {
    pub fn new(api_base: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(POST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// POST the chunks to `/api/vector/add` and return the JSON reply.
    pub async fn add_chunks(&self, chunks: Vec<DocumentChunk>) -> AppResult<Value> {
        let url = format!("{}/api/vector/add", self.api_base);
        let request = AddTextsRequest::from_chunks(chunks);

        tracing::info!(url = %url, count = request.ids.len(), "Posting chunks");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ResponseShape(format!("Invalid reply from {}: {}", url, e)))
    }
}
