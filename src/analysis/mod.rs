//! Abstractions for enriching documents through an external text-analysis capability.
//!
//! The pipeline calls the analysis provider exactly once per document (not per chunk) and
//! stores the result in every chunk's metadata. Providers are treated as black boxes behind
//! [`AnalysisClient`] with a bounded wait; failures propagate as [`AnalysisError`] and are
//! never retried.

pub mod client;

pub use client::OllamaAnalysisClient;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Requested depth of the analysis output.
///
/// The two modes share one algorithm and differ only in how many output sections the
/// prompt requests.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Four-section analysis: main points, objectives, recommendations, attention points.
    #[default]
    Standard,
    /// Seven-section analysis adding an executive summary, key metrics, and next steps.
    Detailed,
}

/// Structured result wrapping the raw provider response.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    /// Raw analysis text produced by the provider.
    pub analysis: String,
    /// ISO-8601 timestamp captured when the response was received.
    pub timestamp: String,
    /// Model identifier that produced the analysis.
    pub model: String,
    /// Version tag of the analysis wrapper format.
    pub version: String,
}

/// Errors surfaced while requesting a document analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Provider was unreachable or the bounded wait elapsed.
    #[error("Analysis provider unavailable: {0}")]
    Unavailable(String),
    /// Provider returned an error response.
    #[error("Analysis request failed ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response could not be parsed.
    #[error("Malformed analysis response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by text-analysis providers.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Analyze the full document text, returning the wrapped provider response.
    async fn analyze(
        &self,
        text: &str,
        mode: AnalysisMode,
    ) -> Result<DocumentAnalysis, AnalysisError>;
}

/// Build the mode-specific instruction template embedding the full input text.
pub(crate) fn build_prompt(content: &str, mode: AnalysisMode) -> String {
    match mode {
        AnalysisMode::Standard => format!(
            "Analyze this document and extract:\n\
             1. Main points\n\
             2. Objectives\n\
             3. Recommendations\n\
             4. Attention points\n\
             \n\
             Document: {content}\n"
        ),
        AnalysisMode::Detailed => format!(
            "Analyze this document in detail and extract:\n\
             1. Executive summary\n\
             2. Main points\n\
             3. Identified objectives\n\
             4. Detailed recommendations\n\
             5. Critical attention points\n\
             6. Key metrics\n\
             7. Suggested next steps\n\
             \n\
             Document: {content}\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_prompt_requests_four_sections() {
        let prompt = build_prompt("body", AnalysisMode::Standard);
        assert!(prompt.contains("4. Attention points"));
        assert!(!prompt.contains("5."));
        assert!(prompt.contains("Document: body"));
    }

    #[test]
    fn detailed_prompt_requests_seven_sections() {
        let prompt = build_prompt("body", AnalysisMode::Detailed);
        assert!(prompt.contains("7. Suggested next steps"));
        assert!(prompt.contains("Document: body"));
    }

    #[test]
    fn mode_deserializes_from_lowercase() {
        let mode: AnalysisMode = serde_json::from_str("\"detailed\"").unwrap();
        assert_eq!(mode, AnalysisMode::Detailed);
    }
}
