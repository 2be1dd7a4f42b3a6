//! Processing-status tracking for asynchronous ingestion.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Lifecycle stage of an asynchronous ingestion task for one document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Submission recorded, pipeline not yet started. Also reported for unknown ids.
    #[default]
    Pending,
    /// Pipeline is running.
    Processing,
    /// Pipeline finished and all chunks were persisted.
    Completed,
    /// Pipeline raised at some stage; partial chunk writes may remain.
    Failed,
}

/// Shared status table plus per-document pipeline locks.
///
/// This replaces a process-global map: the table is owned by the service and handed to
/// pipeline tasks by reference. Records have no persistence guarantee; a restart clears
/// them, and a fresh submission overwrites the prior record for the same id. The keyed
/// mutex serializes pipelines for one `doc_id` so concurrent resubmissions cannot
/// interleave chunk writes; distinct ids proceed in parallel.
#[derive(Default)]
pub struct StatusStore {
    statuses: RwLock<HashMap<String, ProcessingStatus>>,
    pipeline_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StatusStore {
    /// Create an empty status table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status recorded for `doc_id`.
    pub async fn set(&self, doc_id: &str, status: ProcessingStatus) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(doc_id.to_string(), status);
    }

    /// Current status for `doc_id`, defaulting to `Pending` when never seen.
    pub async fn get(&self, doc_id: &str) -> ProcessingStatus {
        let statuses = self.statuses.read().await;
        statuses.get(doc_id).copied().unwrap_or_default()
    }

    /// Acquire the pipeline lock for `doc_id`, waiting while another pipeline for the same
    /// document is in flight.
    ///
    /// Lock entries are retained for the process lifetime; the map stays bounded by the
    /// number of distinct ids submitted.
    pub async fn acquire_pipeline_lock(&self, doc_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.pipeline_locks.lock().await;
            Arc::clone(
                locks
                    .entry(doc_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unknown_ids_default_to_pending() {
        let store = StatusStore::new();
        assert_eq!(store.get("never-seen").await, ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn set_overwrites_previous_status() {
        let store = StatusStore::new();
        store.set("doc", ProcessingStatus::Processing).await;
        store.set("doc", ProcessingStatus::Completed).await;
        assert_eq!(store.get("doc").await, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn pipeline_lock_serializes_same_document() {
        let store = Arc::new(StatusStore::new());
        let guard = store.acquire_pipeline_lock("doc").await;

        let contender = Arc::clone(&store);
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire_pipeline_lock("doc").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("lock released")
            .expect("task completed");
    }

    #[tokio::test]
    async fn pipeline_locks_are_independent_across_documents() {
        let store = StatusStore::new();
        let _first = store.acquire_pipeline_lock("a").await;
        // Must not deadlock: a different id has its own lock.
        let _second = store.acquire_pipeline_lock("b").await;
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ProcessingStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }
}
