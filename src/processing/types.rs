//! Core data types and error definitions for the ingestion pipeline.

use crate::{analysis::AnalysisError, chroma::StoreError};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while configuring the text splitter.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new content in every chunk.
    #[error("chunk overlap {chunk_overlap} must be smaller than chunk size {chunk_size}")]
    OverlapExceedsChunkSize {
        /// Configured chunk budget.
        chunk_size: usize,
        /// Configured overlap.
        chunk_overlap: usize,
    },
}

/// Errors rejecting malformed caller input before any background work is scheduled.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Document identifier was empty or all whitespace.
    #[error("doc_id must not be empty")]
    EmptyDocId,
    /// Document content was empty or all whitespace.
    #[error("content must not be empty")]
    EmptyContent,
}

/// Errors emitted by the background ingestion pipeline.
///
/// These are terminal for the document: the orchestrator logs them and records a `failed`
/// status rather than re-raising to the caller who already received an acknowledgment.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Analysis provider failed or timed out for the document.
    #[error("Failed to analyze document: {0}")]
    Analysis(#[from] AnalysisError),
    /// Vector store interaction failed during the chunk-write loop.
    #[error("Vector store request failed: {0}")]
    Storage(#[from] StoreError),
}

/// Errors emitted by version-history lookups.
#[derive(Debug, Error)]
pub enum VersionError {
    /// No record is stored under the requested id.
    #[error("Document {0} not found")]
    NotFound(String),
    /// Vector store interaction failed during the lookup.
    #[error("Vector store request failed: {0}")]
    Storage(#[from] StoreError),
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Number of chunks persisted for the document.
    pub chunk_count: usize,
}

/// One entry in a chunk's version history.
#[derive(Debug, Clone, Serialize)]
pub struct VersionRecord {
    /// Version counter assigned at storage time.
    pub version: i64,
    /// Stored metadata describing the version's provenance.
    pub metadata: Map<String, Value>,
    /// Chunk text as stored.
    pub content: String,
    /// Whether this entry is the live record under the id.
    pub is_current: bool,
}

/// Version history view for one stored chunk id.
#[derive(Debug, Clone, Serialize)]
pub struct VersionHistory {
    /// Identifier the history was requested for.
    pub doc_id: String,
    /// Known versions, current first.
    pub versions: Vec<VersionRecord>,
}
