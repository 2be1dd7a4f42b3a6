//! Shared types used by the Chroma client and helpers.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Chroma URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Chroma responded with an unexpected status code.
    #[error("Unexpected Chroma response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Chroma.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Embedding client failed to produce a vector for the text.
    #[error("Failed to embed text: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),
    /// Response parsed but did not carry the expected fields.
    #[error("Malformed Chroma response: {0}")]
    MalformedResponse(String),
}

/// A persisted chunk record fetched by id.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Identifier the record was stored under.
    pub id: String,
    /// Raw chunk text.
    pub content: String,
    /// Metadata persisted alongside the chunk, including server-added fields.
    pub metadata: Map<String, Value>,
}

/// A similarity-query candidate returned by the store, most similar first.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    /// Raw chunk text.
    pub content: String,
    /// Metadata persisted alongside the chunk.
    pub metadata: Map<String, Value>,
    /// Cosine distance reported by the index, in `[0, 2]`.
    pub distance: f32,
}

/// Narrow interface the pipeline uses to persist and query chunks.
///
/// The orchestrator and retrieval engine only see this trait; the Chroma adapter is one
/// implementation and tests substitute in-memory stubs.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist one chunk addressable by `id`, enriching metadata with `date_added` and
    /// `version` before storage. Returns the metadata as stored. Writing an existing id
    /// replaces the record in place.
    async fn upsert(
        &self,
        id: &str,
        content: &str,
        metadata: Map<String, Value>,
    ) -> Result<Map<String, Value>, StoreError>;

    /// Fetch a single record by id, or `None` when the id is unknown.
    async fn get_by_id(&self, id: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Run a similarity query for `query` returning up to `top_k` candidates ordered by
    /// increasing cosine distance.
    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, StoreError>;
}

#[derive(Deserialize)]
pub(crate) struct CollectionResponse {
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct GetResponse {
    pub(crate) ids: Vec<String>,
    #[serde(default)]
    pub(crate) documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub(crate) metadatas: Option<Vec<Option<Map<String, Value>>>>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub(crate) metadatas: Vec<Vec<Option<Map<String, Value>>>>,
    #[serde(default)]
    pub(crate) distances: Vec<Vec<f32>>,
}
