//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Flat key/value metadata attached to a chunk.
///
/// Values are restricted to primitives (string, number, boolean, null).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored unit of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One match returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,

    /// Stored chunk text
    pub document: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Cosine distance to the query; smaller is closer
    pub distance: f32,
}

impl RetrievalResult {
    /// First non-empty label among `source`, `host` and `url` metadata.
    pub fn source_label(&self) -> &str {
        ["source", "host", "url"]
            .iter()
            .filter_map(|key| self.metadata.get(*key))
            .filter_map(|value| value.as_str())
            .find(|value| !value.is_empty())
            .unwrap_or("")
    }
}

/// Body of `POST /api/vector/add`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddTextsRequest {
    pub ids: Vec<String>,
    pub texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Metadata>>,
}

impl AddTextsRequest {
    /// Build a request from chunks, keeping their order.
    pub fn from_chunks(chunks: Vec<DocumentChunk>) -> Self {
        let mut request = Self {
            ids: Vec::with_capacity(chunks.len()),
            texts: Vec::with_capacity(chunks.len()),
            metadatas: Some(Vec::with_capacity(chunks.len())),
        };

        for chunk in chunks {
            request.ids.push(chunk.id);
            request.texts.push(chunk.text);
            if let Some(ref mut metadatas) = request.metadatas {
                metadatas.push(chunk.metadata);
            }
        }

        request
    }
}

/// Reply of `POST /api/vector/add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTextsResponse {
    pub status: String,
    pub count: usize,
}

/// Body of `POST /api/vector/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    5
}

/// Reply of `POST /api/vector/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RetrievalResult>,
}
