//! Ollama-backed analysis provider.

use super::{AnalysisClient, AnalysisError, AnalysisMode, DocumentAnalysis, build_prompt};
use crate::config::get_config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Upper bound on a single analysis call.
const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Version tag stored with every analysis result.
const ANALYSIS_VERSION: &str = "1.0";

/// Analysis client issuing single-shot generate requests against an Ollama runtime.
pub struct OllamaAnalysisClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaAnalysisClient {
    /// Build a client from the process configuration.
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
            config.analysis_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Build a client for an explicit endpoint, model, and timeout.
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> Self {
        let http = Client::builder()
            .user_agent("ragstore/analysis")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to construct reqwest::Client for analysis");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl AnalysisClient for OllamaAnalysisClient {
    async fn analyze(
        &self,
        text: &str,
        mode: AnalysisMode,
    ) -> Result<DocumentAnalysis, AnalysisError> {
        let started = std::time::Instant::now();
        tracing::info!(mode = ?mode, model = %self.model, "Starting document analysis");

        let payload = json!({
            "model": self.model,
            "prompt": build_prompt(text, mode),
            "stream": false,
            "options": {
                "temperature": 0.7,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                AnalysisError::Unavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::UnexpectedStatus { status, body });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|error| AnalysisError::InvalidResponse(error.to_string()))?;
        if !parsed.done {
            return Err(AnalysisError::InvalidResponse(
                "provider reported an incomplete generation".to_string(),
            ));
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document analysis finished"
        );

        Ok(DocumentAnalysis {
            analysis: parsed.response,
            timestamp: response_timestamp(),
            model: self.model.clone(),
            version: ANALYSIS_VERSION.to_string(),
        })
    }
}

fn response_timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn analyze_wraps_provider_response_with_metadata() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{ "model": "mistral", "stream": false }"#);
                then.status(200).json_body(serde_json::json!({
                    "response": "1. Main points: ...",
                    "done": true,
                }));
            })
            .await;

        let client = OllamaAnalysisClient::new(server.base_url(), "mistral".into(), 5);
        let result = client
            .analyze("document body", AnalysisMode::Standard)
            .await
            .expect("analysis result");

        mock.assert();
        assert_eq!(result.analysis, "1. Main points: ...");
        assert_eq!(result.model, "mistral");
        assert_eq!(result.version, "1.0");
        assert!(result.timestamp.contains('T'));
    }

    #[tokio::test]
    async fn analyze_surfaces_error_statuses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("model crashed");
            })
            .await;

        let client = OllamaAnalysisClient::new(server.base_url(), "mistral".into(), 5);
        let error = client
            .analyze("document body", AnalysisMode::Standard)
            .await
            .unwrap_err();
        assert!(matches!(error, AnalysisError::UnexpectedStatus { .. }));
    }

    #[tokio::test]
    async fn analyze_rejects_incomplete_generations() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(serde_json::json!({ "response": "partial", "done": false }));
            })
            .await;

        let client = OllamaAnalysisClient::new(server.base_url(), "mistral".into(), 5);
        let error = client
            .analyze("document body", AnalysisMode::Standard)
            .await
            .unwrap_err();
        assert!(matches!(error, AnalysisError::InvalidResponse(_)));
    }
}
