//! Chroma vector store integration.

pub mod client;
mod payload;
pub mod types;

pub use client::ChromaStore;
pub use types::{QueryMatch, StoreError, StoredRecord, VectorStore};
