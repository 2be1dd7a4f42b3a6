//! HTTP surface for the ragstore server.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Accept a document for asynchronous ingestion. Returns `202 Accepted`
//!   immediately with a pointer to the status endpoint; chunking, analysis, and storage run
//!   in a background task.
//! - `GET /status/:doc_id` – Poll the processing status of a submitted document
//!   (`pending` | `processing` | `completed` | `failed`).
//! - `POST /search` – Run a relevance-filtered similarity search over stored chunks.
//! - `GET /versions/:id` – Version history for a stored chunk id.
//! - `GET /metrics` – Observe ingestion counters.
//! - `GET /` – Liveness banner with version and timestamp.
//!
//! Handlers stay thin: request decoding and status mapping here, behavior in the
//! [`DocumentApi`] implementation behind the shared state.

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    DocumentApi, ProcessingStatus, ValidationError, VersionError, VersionRecord,
};
use crate::retrieval::{DEFAULT_RESULT_COUNT, SearchError, SearchResult};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/documents", post(add_document::<S>))
        .route("/status/:doc_id", get(document_status::<S>))
        .route("/search", post(search_documents::<S>))
        .route("/versions/:id", get(document_versions::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Liveness banner for `GET /`.
async fn root() -> Json<serde_json::Value> {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());
    Json(json!({
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp,
    }))
}

/// Request body for the `POST /documents` endpoint.
#[derive(Deserialize)]
struct AddDocumentRequest {
    /// Caller-chosen document identifier; resubmitting an id overwrites its chunks.
    doc_id: String,
    /// Raw document text to chunk, analyze, and store.
    content: String,
    /// Optional provenance metadata copied onto every chunk (author, category, source, ...).
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Acknowledgment body for the `POST /documents` endpoint.
#[derive(Serialize)]
struct AddDocumentResponse {
    status: &'static str,
    doc_id: String,
    message: &'static str,
    status_endpoint: String,
}

/// Accept a document and schedule its background ingestion.
///
/// Validation failures are reported synchronously with `400`; everything after the
/// `202 Accepted` is observable only through `GET /status/:doc_id`.
async fn add_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AddDocumentRequest>,
) -> Result<(StatusCode, Json<AddDocumentResponse>), AppError>
where
    S: DocumentApi,
{
    let doc_id = request.doc_id.clone();
    service
        .submit(request.doc_id, request.content, request.metadata)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AddDocumentResponse {
            status: "accepted",
            status_endpoint: format!("/status/{doc_id}"),
            doc_id,
            message: "Document accepted for processing",
        }),
    ))
}

/// Response body for `GET /status/:doc_id`.
#[derive(Serialize)]
struct StatusResponse {
    doc_id: String,
    status: ProcessingStatus,
}

/// Report the processing status for a document id.
///
/// Unknown ids report `pending`; the status table is in-memory and does not distinguish
/// never-submitted ids from not-yet-started ones.
async fn document_status<S>(
    State(service): State<Arc<S>>,
    Path(doc_id): Path<String>,
) -> Json<StatusResponse>
where
    S: DocumentApi,
{
    let status = service.status(&doc_id).await;
    Json(StatusResponse { doc_id, status })
}

/// Request body for the `POST /search` endpoint.
#[derive(Deserialize)]
struct SearchRequest {
    /// Free-text query embedded and matched against stored chunks.
    query: String,
    /// Optional result count, defaulting to 3 and capped at 10.
    #[serde(default)]
    n_results: Option<usize>,
}

/// Response body for the `POST /search` endpoint.
#[derive(Serialize)]
struct SearchResponseBody {
    status: &'static str,
    results: Vec<SearchResult>,
    total_candidates: usize,
    filtered_results: usize,
}

/// Run a ranked similarity search over stored chunks.
async fn search_documents<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponseBody>, AppError>
where
    S: DocumentApi,
{
    let n = request.n_results.unwrap_or(DEFAULT_RESULT_COUNT);
    let response = service.search(&request.query, n).await?;
    Ok(Json(SearchResponseBody {
        status: "success",
        results: response.results,
        total_candidates: response.total_candidates,
        filtered_results: response.filtered_results,
    }))
}

/// Response body for the `GET /versions/:id` endpoint.
#[derive(Serialize)]
struct VersionsResponseBody {
    status: &'static str,
    doc_id: String,
    versions: Vec<VersionRecord>,
}

/// Report the version history for a stored chunk id.
async fn document_versions<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<VersionsResponseBody>, AppError>
where
    S: DocumentApi,
{
    let history = service.versions(&id).await?;
    Ok(Json(VersionsResponseBody {
        status: "success",
        doc_id: history.doc_id,
        versions: history.versions,
    }))
}

/// Return ingestion counters for observability.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

/// Error wrapper translating domain errors into HTTP status codes.
enum AppError {
    Validation(ValidationError),
    Search(SearchError),
    Version(VersionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Search(SearchError::InvalidResultCount { .. }) => StatusCode::BAD_REQUEST,
            AppError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Version(VersionError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Version(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match self {
            AppError::Validation(inner) => inner.to_string(),
            AppError::Search(inner) => inner.to_string(),
            AppError::Version(inner) => inner.to_string(),
        };
        (status, Json(json!({ "detail": message }))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        Self::Validation(inner)
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}

impl From<VersionError> for AppError {
    fn from(inner: VersionError) -> Self {
        Self::Version(inner)
    }
}
