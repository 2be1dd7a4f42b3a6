//! HTTP client wrapper for interacting with Chroma.

use crate::chroma::{
    payload::enrich_metadata,
    types::{
        CollectionResponse, GetResponse, QueryMatch, QueryResponse, StoreError, StoredRecord,
        VectorStore,
    },
};
use crate::config::get_config;
use crate::embedding::{EmbeddingClient, get_embedding_client};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

/// Lightweight HTTP adapter over Chroma's REST API.
///
/// Embeddings are computed client-side through the [`EmbeddingClient`] seam and shipped
/// alongside documents, so the store only ever sees prepared vectors. The collection id is
/// resolved once per process and cached.
pub struct ChromaStore {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) auth_token: Option<String>,
    pub(crate) collection_name: String,
    pub(crate) collection_id: OnceCell<String>,
    pub(crate) embedder: Box<dyn EmbeddingClient + Send + Sync>,
}

impl ChromaStore {
    /// Construct a new adapter using configuration derived from the environment.
    pub fn new() -> Result<Self, StoreError> {
        let config = get_config();
        let client = Client::builder().user_agent("ragstore/0.1").build()?;
        let base_url = normalize_base_url(&config.chroma_url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %config.chroma_collection_name,
            "Initialized Chroma HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            auth_token: config.chroma_auth_token.clone(),
            collection_name: config.chroma_collection_name.clone(),
            collection_id: OnceCell::new(),
            embedder: get_embedding_client(),
        })
    }

    /// Resolve the collection, creating it with a cosine similarity space when missing.
    ///
    /// Called once at startup so ingestion and search never race on collection creation.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let id = self.collection_id().await?;
        tracing::debug!(collection = %self.collection_name, id = %id, "Collection ready");
        Ok(())
    }

    async fn collection_id(&self) -> Result<&str, StoreError> {
        self.collection_id
            .get_or_try_init(|| self.resolve_collection())
            .await
            .map(String::as_str)
    }

    async fn resolve_collection(&self) -> Result<String, StoreError> {
        let body = json!({
            "name": self.collection_name,
            "get_or_create": true,
            "metadata": { "hnsw:space": "cosine" },
        });

        let response = self
            .request(Method::POST, "api/v1/collections")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection_name, error = %error, "Failed to resolve collection");
            return Err(error);
        }

        let collection: CollectionResponse = response.json().await?;
        Ok(collection.id)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(token) = self.auth_token.as_deref().filter(|token| !token.is_empty()) {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn ensure_success(&self, response: reqwest::Response) -> Result<(), StoreError> {
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Chroma request failed");
            Err(error)
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut vectors = self.embedder.embed(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            StoreError::MalformedResponse("embedding client returned no vectors".to_string())
        })
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn upsert(
        &self,
        id: &str,
        content: &str,
        metadata: Map<String, Value>,
    ) -> Result<Map<String, Value>, StoreError> {
        let collection_id = self.collection_id().await?.to_string();
        let vector = self.embed_one(content).await?;
        let stored = enrich_metadata(metadata);

        let body = json!({
            "ids": [id],
            "embeddings": [vector],
            "documents": [content],
            "metadatas": [stored],
        });

        let response = self
            .request(
                Method::POST,
                &format!("api/v1/collections/{collection_id}/upsert"),
            )
            .json(&body)
            .send()
            .await?;
        self.ensure_success(response).await?;

        tracing::debug!(id, "Chunk upserted");
        Ok(stored)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let collection_id = self.collection_id().await?.to_string();
        let body = json!({
            "ids": [id],
            "include": ["documents", "metadatas"],
        });

        let response = self
            .request(
                Method::POST,
                &format!("api/v1/collections/{collection_id}/get"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedStatus { status, body });
        }

        let payload: GetResponse = response.json().await?;
        let Some(found_id) = payload.ids.first() else {
            return Ok(None);
        };

        let content = payload
            .documents
            .and_then(|mut documents| documents.drain(..).next().flatten())
            .unwrap_or_default();
        let metadata = payload
            .metadatas
            .and_then(|mut metadatas| metadatas.drain(..).next().flatten())
            .unwrap_or_default();

        Ok(Some(StoredRecord {
            id: found_id.clone(),
            content,
            metadata,
        }))
    }

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let collection_id = self.collection_id().await?.to_string();
        let vector = self.embed_one(query).await?;
        let body = json!({
            "query_embeddings": [vector],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self
            .request(
                Method::POST,
                &format!("api/v1/collections/{collection_id}/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection_name, error = %error, "Chroma query failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let documents = payload.documents.into_iter().next().unwrap_or_default();
        let mut metadatas = payload
            .metadatas
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter();
        let mut distances = payload.distances.into_iter().next().unwrap_or_default().into_iter();

        let matches = documents
            .into_iter()
            .map(|document| {
                let metadata = metadatas.next().flatten().unwrap_or_default();
                let distance = distances.next().unwrap_or(2.0);
                QueryMatch {
                    content: document.unwrap_or_default(),
                    metadata,
                    distance,
                }
            })
            .collect();

        Ok(matches)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use httpmock::{Method::POST, MockServer};

    fn store_for(server: &MockServer) -> ChromaStore {
        ChromaStore {
            client: Client::builder()
                .user_agent("ragstore-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            auth_token: None,
            collection_name: "documents".into(),
            collection_id: OnceCell::new(),
            embedder: Box::new(HashEmbedder::new(4)),
        }
    }

    #[tokio::test]
    async fn similarity_search_parses_candidates_in_order() {
        let server = MockServer::start_async().await;

        let collection_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/collections");
                then.status(200)
                    .json_body(json!({ "id": "col-1", "name": "documents" }));
            })
            .await;
        let query_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/collections/col-1/query");
                then.status(200).json_body(json!({
                    "ids": [["doc1_chunk_0", "doc2_chunk_1"]],
                    "documents": [["first chunk", "second chunk"]],
                    "metadatas": [[{ "doc_id": "doc1" }, { "doc_id": "doc2" }]],
                    "distances": [[0.2, 0.9]],
                }));
            })
            .await;

        let store = store_for(&server);
        let matches = store
            .similarity_search("query text", 2)
            .await
            .expect("query request");

        collection_mock.assert();
        query_mock.assert();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].content, "first chunk");
        assert_eq!(matches[0].metadata["doc_id"], "doc1");
        assert!((matches[0].distance - 0.2).abs() < f32::EPSILON);
        assert!(matches[0].distance < matches[1].distance);
    }

    #[tokio::test]
    async fn get_by_id_returns_none_for_unknown_ids() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/collections");
                then.status(200)
                    .json_body(json!({ "id": "col-1", "name": "documents" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/collections/col-1/get");
                then.status(200).json_body(json!({
                    "ids": [],
                    "documents": [],
                    "metadatas": [],
                }));
            })
            .await;

        let store = store_for(&server);
        let record = store.get_by_id("missing_chunk_0").await.expect("get request");
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn upsert_returns_enriched_metadata() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/collections");
                then.status(200)
                    .json_body(json!({ "id": "col-1", "name": "documents" }));
            })
            .await;
        let upsert_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/collections/col-1/upsert")
                    .json_body_partial(r#"{ "ids": ["doc1_chunk_0"] }"#);
                then.status(200).json_body(json!(true));
            })
            .await;

        let store = store_for(&server);
        let mut metadata = Map::new();
        metadata.insert("author".into(), json!("Jo"));

        let stored = store
            .upsert("doc1_chunk_0", "chunk body", metadata)
            .await
            .expect("upsert request");

        upsert_mock.assert();
        assert_eq!(stored["author"], "Jo");
        assert_eq!(stored["version"], 1);
        assert!(stored.contains_key("date_added"));
    }
}
