//! Document service coordinating chunking, analysis, storage, and status tracking.

use crate::{
    analysis::{AnalysisClient, AnalysisMode, OllamaAnalysisClient},
    chroma::{ChromaStore, StoredRecord, VectorStore},
    config::get_config,
    metrics::{IngestMetrics, MetricsSnapshot},
    processing::{
        chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextSplitter},
        status::{ProcessingStatus, StatusStore},
        types::{
            IngestOutcome, ProcessingError, ValidationError, VersionError, VersionHistory,
            VersionRecord,
        },
    },
    retrieval::{DEFAULT_MIN_RELEVANCE, RetrievalEngine, SearchError, SearchResponse},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Coordinates the full ingestion pipeline and the read-side surfaces.
///
/// The service owns long-lived handles to the analysis client, the vector store, the
/// retrieval engine, the status table, and the metrics registry. Construct it once near
/// process start and share it through an `Arc`; spawned pipeline tasks hold cheap clones.
#[derive(Clone)]
pub struct DocumentService {
    splitter: TextSplitter,
    analysis: Arc<dyn AnalysisClient>,
    store: Arc<dyn VectorStore>,
    retrieval: RetrievalEngine,
    status: Arc<StatusStore>,
    metrics: Arc<IngestMetrics>,
}

/// Abstraction over the document pipeline used by the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Validate a submission and schedule its background ingestion.
    ///
    /// Returns as soon as the task is scheduled; the caller observes progress by polling
    /// [`DocumentApi::status`].
    async fn submit(
        &self,
        doc_id: String,
        content: String,
        metadata: HashMap<String, String>,
    ) -> Result<(), ValidationError>;

    /// Current processing status for a document id.
    async fn status(&self, doc_id: &str) -> ProcessingStatus;

    /// Run a ranked similarity search returning at most `n` results.
    async fn search(&self, query: &str, n: usize) -> Result<SearchResponse, SearchError>;

    /// Version history for a stored chunk id.
    async fn versions(&self, id: &str) -> Result<VersionHistory, VersionError>;

    /// Snapshot of the ingestion counters for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DocumentService {
    /// Build the service from process configuration, ensuring the backing collection
    /// exists before any request is served.
    pub async fn new() -> Self {
        let config = get_config();
        tracing::info!("Initializing vector store client");
        let store = ChromaStore::new().expect("Failed to construct Chroma client");
        store
            .ensure_collection()
            .await
            .expect("Failed to ensure Chroma collection exists");
        tracing::debug!(collection = %config.chroma_collection_name, "Collection ready");

        let splitter = TextSplitter::new(
            config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            config.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
        )
        .expect("Invalid chunking configuration");
        let min_relevance = config
            .search_min_relevance
            .unwrap_or(DEFAULT_MIN_RELEVANCE);

        Self::from_parts(
            splitter,
            Arc::new(OllamaAnalysisClient::from_config()),
            Arc::new(store),
            min_relevance,
        )
    }

    fn from_parts(
        splitter: TextSplitter,
        analysis: Arc<dyn AnalysisClient>,
        store: Arc<dyn VectorStore>,
        min_relevance: f32,
    ) -> Self {
        let retrieval = RetrievalEngine::new(Arc::clone(&store), min_relevance);
        Self {
            splitter,
            analysis,
            store,
            retrieval,
            status: Arc::new(StatusStore::new()),
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Validate the submission, record it as `pending`, and spawn the pipeline task.
    pub async fn submit(
        &self,
        doc_id: String,
        content: String,
        metadata: HashMap<String, String>,
    ) -> Result<(), ValidationError> {
        if doc_id.trim().is_empty() {
            return Err(ValidationError::EmptyDocId);
        }
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        self.status.set(&doc_id, ProcessingStatus::Pending).await;
        self.metrics.record_submitted();
        tracing::info!(doc_id = %doc_id, "Document accepted for processing");

        let service = self.clone();
        tokio::spawn(async move {
            service.run_pipeline(doc_id, content, metadata).await;
        });
        Ok(())
    }

    /// Current processing status, defaulting to `pending` for unknown ids.
    pub async fn status(&self, doc_id: &str) -> ProcessingStatus {
        self.status.get(doc_id).await
    }

    /// Ranked similarity search over the stored chunks.
    pub async fn search(&self, query: &str, n: usize) -> Result<SearchResponse, SearchError> {
        self.retrieval.search(query, n).await
    }

    /// Version history for a stored chunk id.
    pub async fn versions(&self, id: &str) -> Result<VersionHistory, VersionError> {
        let record = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| VersionError::NotFound(id.to_string()))?;
        Ok(version_history(record))
    }

    /// Snapshot of the ingestion counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run one document through the pipeline and record its terminal status.
    ///
    /// Errors are terminal here: the submitter already received an acknowledgment, so
    /// failures are logged and surface only through the status table.
    async fn run_pipeline(
        &self,
        doc_id: String,
        content: String,
        metadata: HashMap<String, String>,
    ) {
        // Serialize pipelines per document id; concurrent resubmissions would otherwise
        // interleave chunk writes for the same chunk ids.
        let _guard = self.status.acquire_pipeline_lock(&doc_id).await;
        self.status.set(&doc_id, ProcessingStatus::Processing).await;

        match self.ingest(&doc_id, &content, metadata).await {
            Ok(outcome) => {
                self.metrics.record_completed(outcome.chunk_count as u64);
                self.status.set(&doc_id, ProcessingStatus::Completed).await;
                tracing::info!(
                    doc_id = %doc_id,
                    chunks = outcome.chunk_count,
                    "Document ingested"
                );
            }
            Err(error) => {
                self.metrics.record_failed();
                tracing::error!(doc_id = %doc_id, error = %error, "Document ingestion failed");
                self.status.set(&doc_id, ProcessingStatus::Failed).await;
            }
        }
    }

    /// Single-pass pipeline: chunk, analyze the whole document once, persist each chunk.
    ///
    /// Chunk writes are sequential and not transactional; a mid-loop failure leaves the
    /// earlier chunks in place, where the next successful resubmission overwrites them.
    async fn ingest(
        &self,
        doc_id: &str,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<IngestOutcome, ProcessingError> {
        let chunks = self.splitter.split(content);
        let total_chunks = chunks.len();
        tracing::info!(doc_id, chunks = total_chunks, "Document split");

        // One analysis call over the whole document feeds every chunk; per-chunk calls
        // would multiply provider cost and latency by the chunk count.
        let analysis = self.analysis.analyze(content, AnalysisMode::Standard).await?;

        let mut shared = Map::new();
        for (key, value) in metadata {
            shared.insert(key, Value::String(value));
        }
        shared.insert("doc_id".into(), Value::String(doc_id.to_string()));
        shared.insert("ai_analysis".into(), Value::String(analysis.analysis));
        shared.insert("processed".into(), Value::Bool(true));
        shared.insert("chunks_count".into(), Value::from(total_chunks));

        for (index, chunk) in chunks.iter().enumerate() {
            let mut chunk_metadata = shared.clone();
            chunk_metadata.insert("chunk_index".into(), Value::from(index));
            chunk_metadata.insert("total_chunks".into(), Value::from(total_chunks));

            let chunk_id = format!("{doc_id}_chunk_{index}");
            if let Err(error) = self.store.upsert(&chunk_id, chunk, chunk_metadata).await {
                tracing::error!(
                    doc_id,
                    chunk_id = %chunk_id,
                    chunks_persisted = index,
                    "Chunk write failed; earlier chunks remain stored"
                );
                return Err(error.into());
            }
            tracing::debug!(doc_id, chunk_id = %chunk_id, "Chunk persisted");
        }

        Ok(IngestOutcome {
            chunk_count: total_chunks,
        })
    }
}

/// Build the version view for a stored chunk.
///
/// Chunk ids are overwritten in place on resubmission, so the history always contains the
/// single live record marked `is_current`.
fn version_history(record: StoredRecord) -> VersionHistory {
    let version = record
        .metadata
        .get("version")
        .and_then(Value::as_i64)
        .unwrap_or(1);

    let mut provenance = Map::new();
    for key in ["date_added", "author", "category", "source"] {
        let value = record
            .metadata
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::String("N/A".into()));
        provenance.insert(key.to_string(), value);
    }

    VersionHistory {
        doc_id: record.id,
        versions: vec![VersionRecord {
            version,
            metadata: provenance,
            content: record.content,
            is_current: true,
        }],
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn submit(
        &self,
        doc_id: String,
        content: String,
        metadata: HashMap<String, String>,
    ) -> Result<(), ValidationError> {
        DocumentService::submit(self, doc_id, content, metadata).await
    }

    async fn status(&self, doc_id: &str) -> ProcessingStatus {
        DocumentService::status(self, doc_id).await
    }

    async fn search(&self, query: &str, n: usize) -> Result<SearchResponse, SearchError> {
        DocumentService::search(self, query, n).await
    }

    async fn versions(&self, id: &str) -> Result<VersionHistory, VersionError> {
        DocumentService::versions(self, id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
