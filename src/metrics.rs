use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters tracking the ingestion lifecycle.
#[derive(Default)]
pub struct IngestMetrics {
    documents_submitted: AtomicU64,
    documents_completed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_stored: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document accepted for background processing.
    pub fn record_submitted(&self) {
        self.documents_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a pipeline that finished successfully along with its chunk count.
    pub fn record_completed(&self, chunk_count: u64) {
        self.documents_completed.fetch_add(1, Ordering::Relaxed);
        self.chunks_stored.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a pipeline that ended in a terminal failure.
    pub fn record_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            documents_completed: self.documents_completed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_stored: self.chunks_stored.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents accepted since startup.
    pub documents_submitted: u64,
    /// Number of documents whose pipeline reached `completed`.
    pub documents_completed: u64,
    /// Number of documents whose pipeline reached `failed`.
    pub documents_failed: u64,
    /// Total chunk count persisted across all completed documents.
    pub chunks_stored: u64,
}
