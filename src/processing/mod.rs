//! Document ingestion pipeline: chunking, status tracking, and orchestration.

pub mod chunking;
pub mod service;
pub mod status;
pub mod types;

pub use chunking::TextSplitter;
pub use service::{DocumentApi, DocumentService};
pub use status::{ProcessingStatus, StatusStore};
pub use types::{
    ChunkingError, IngestOutcome, ProcessingError, ValidationError, VersionError,
    VersionHistory, VersionRecord,
};
