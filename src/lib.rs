#![deny(missing_docs)]

//! Core library for the ragstore document ingestion and retrieval server.

/// Document analysis client abstraction and the Ollama adapter.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Chroma vector store integration.
pub mod chroma;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Similarity search ranking and filtering.
pub mod retrieval;
