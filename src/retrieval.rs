//! Similarity search with relevance filtering and ranking.
//!
//! The engine over-fetches `2×n` candidates from the vector store so the relevance filter
//! has room to discard weak matches, converts each cosine distance into a normalized
//! relevance score, and returns the top `n` by descending score. Responses carry the
//! candidate and retained counts so callers can distinguish "no matches" from "strict
//! filter". An empty candidate set is a well-formed empty response, not an error.

use crate::chroma::{QueryMatch, StoreError, VectorStore};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Default number of results returned when the caller does not specify one.
pub const DEFAULT_RESULT_COUNT: usize = 3;
/// Upper bound on the number of results a single search may request.
pub const MAX_RESULT_COUNT: usize = 10;
/// Default minimum relevance score kept by the filter.
pub const DEFAULT_MIN_RELEVANCE: f32 = 0.7;

/// Over-fetch factor applied to the store query so filtering can discard candidates.
const CANDIDATE_MULTIPLIER: usize = 2;

/// Errors emitted while orchestrating similarity searches.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Requested result count is outside `[1, MAX_RESULT_COUNT]`.
    #[error("n_results must be between 1 and {MAX_RESULT_COUNT}, got {requested}")]
    InvalidResultCount {
        /// Count the caller asked for.
        requested: usize,
    },
    /// Vector store query failed.
    #[error("Vector store request failed: {0}")]
    Storage(#[from] StoreError),
}

/// One ranked search hit. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Chunk text.
    pub content: String,
    /// Chunk metadata as stored.
    pub metadata: Map<String, Value>,
    /// Normalized relevance in `[0, 1]`, rounded to 3 decimals; higher is more similar.
    pub relevance_score: f32,
}

/// Ranked search results plus filter diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Retained results, best first, at most the requested count.
    pub results: Vec<SearchResult>,
    /// Number of candidates returned by the store before filtering.
    pub total_candidates: usize,
    /// Number of candidates that survived the relevance filter and truncation.
    pub filtered_results: usize,
}

/// Executes similarity queries against the vector store and ranks the outcome.
#[derive(Clone)]
pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    min_relevance: f32,
}

impl RetrievalEngine {
    /// Build an engine over the given store with a relevance threshold in `[0, 1]`.
    pub fn new(store: Arc<dyn VectorStore>, min_relevance: f32) -> Self {
        Self {
            store,
            min_relevance: min_relevance.clamp(0.0, 1.0),
        }
    }

    /// Run a similarity search returning at most `n` results with relevance at or above
    /// the configured threshold.
    pub async fn search(&self, query: &str, n: usize) -> Result<SearchResponse, SearchError> {
        if n == 0 || n > MAX_RESULT_COUNT {
            return Err(SearchError::InvalidResultCount { requested: n });
        }

        let candidates = self
            .store
            .similarity_search(query, n * CANDIDATE_MULTIPLIER)
            .await?;
        let response = rank_candidates(candidates, n, self.min_relevance);
        tracing::debug!(
            total_candidates = response.total_candidates,
            filtered_results = response.filtered_results,
            "Search completed"
        );
        Ok(response)
    }
}

/// Convert a cosine distance in `[0, 2]` into a relevance score in `[0, 1]`.
///
/// Distance 0 maps to 1.0, distance 2 maps to 0.0, and the mapping is strictly decreasing
/// in between. Filtering and ranking use this raw score; only the reported
/// `relevance_score` is rounded.
pub(crate) fn relevance_from_distance(distance: f32) -> f32 {
    1.0 - distance / 2.0
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Score, filter, rank, and truncate raw store candidates.
pub(crate) fn rank_candidates(
    candidates: Vec<QueryMatch>,
    n: usize,
    min_relevance: f32,
) -> SearchResponse {
    let total_candidates = candidates.len();

    let mut scored: Vec<(f32, QueryMatch)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let score = relevance_from_distance(candidate.distance);
            (score >= min_relevance).then_some((score, candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(n);

    let results: Vec<SearchResult> = scored
        .into_iter()
        .map(|(score, candidate)| SearchResult {
            content: candidate.content,
            metadata: candidate.metadata,
            relevance_score: round3(score),
        })
        .collect();

    SearchResponse {
        filtered_results: results.len(),
        total_candidates,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn candidate(content: &str, distance: f32) -> QueryMatch {
        QueryMatch {
            content: content.to_string(),
            metadata: Map::new(),
            distance,
        }
    }

    #[test]
    fn relevance_bounds_match_the_distance_range() {
        assert_eq!(relevance_from_distance(0.0), 1.0);
        assert_eq!(relevance_from_distance(2.0), 0.0);
        assert_eq!(relevance_from_distance(1.0), 0.5);
    }

    #[test]
    fn relevance_is_monotonically_decreasing() {
        let distances = [0.0_f32, 0.3, 0.8, 1.2, 1.7, 2.0];
        let scores: Vec<f32> = distances
            .iter()
            .map(|d| relevance_from_distance(*d))
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn reported_scores_are_rounded_to_three_decimals() {
        // d = 0.1234 -> s = 0.9383, reported as 0.938.
        let response = rank_candidates(vec![candidate("a", 0.1234)], 1, 0.0);
        assert_eq!(response.results[0].relevance_score, 0.938);
    }

    #[test]
    fn threshold_compares_unrounded_scores() {
        // d = 0.6005 -> s = 0.69975: below the 0.7 threshold even though it would
        // round up to 0.7, so it must be dropped before any rounding happens.
        let candidates = vec![candidate("under", 0.6005), candidate("over", 0.4)];

        let response = rank_candidates(candidates, 3, 0.7);

        assert_eq!(response.total_candidates, 2);
        assert_eq!(response.filtered_results, 1);
        assert_eq!(response.results[0].content, "over");
        assert_eq!(response.results[0].relevance_score, 0.8);
    }

    #[test]
    fn ranking_filters_sorts_and_truncates() {
        // Scores 0.9, 0.75, 0.5, 0.95 with threshold 0.7 and n = 3.
        let candidates = vec![
            candidate("a", 0.2),
            candidate("b", 0.5),
            candidate("c", 1.0),
            candidate("d", 0.1),
        ];

        let response = rank_candidates(candidates, 3, 0.7);
        let scores: Vec<f32> = response
            .results
            .iter()
            .map(|result| result.relevance_score)
            .collect();

        assert_eq!(scores, vec![0.95, 0.9, 0.75]);
        assert_eq!(response.total_candidates, 4);
        assert_eq!(response.filtered_results, 3);
    }

    #[test]
    fn empty_candidates_yield_a_well_formed_response() {
        let response = rank_candidates(Vec::new(), 5, 0.7);
        assert!(response.results.is_empty());
        assert_eq!(response.total_candidates, 0);
        assert_eq!(response.filtered_results, 0);
    }

    struct FixedStore {
        matches: Vec<QueryMatch>,
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        async fn upsert(
            &self,
            _id: &str,
            _content: &str,
            metadata: Map<String, Value>,
        ) -> Result<Map<String, Value>, StoreError> {
            Ok(metadata)
        }

        async fn get_by_id(
            &self,
            _id: &str,
        ) -> Result<Option<crate::chroma::StoredRecord>, StoreError> {
            Ok(None)
        }

        async fn similarity_search(
            &self,
            _query: &str,
            top_k: usize,
        ) -> Result<Vec<QueryMatch>, StoreError> {
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }
    }

    #[tokio::test]
    async fn engine_rejects_out_of_range_counts() {
        let engine = RetrievalEngine::new(
            Arc::new(FixedStore {
                matches: Vec::new(),
            }),
            DEFAULT_MIN_RELEVANCE,
        );

        assert!(matches!(
            engine.search("q", 0).await,
            Err(SearchError::InvalidResultCount { requested: 0 })
        ));
        assert!(matches!(
            engine.search("q", 11).await,
            Err(SearchError::InvalidResultCount { requested: 11 })
        ));
    }

    #[tokio::test]
    async fn identical_searches_return_identical_results() {
        let engine = RetrievalEngine::new(
            Arc::new(FixedStore {
                matches: vec![candidate("a", 0.2), candidate("b", 0.4), candidate("c", 0.3)],
            }),
            DEFAULT_MIN_RELEVANCE,
        );

        let first = engine.search("same query", 3).await.unwrap();
        let second = engine.search("same query", 3).await.unwrap();

        let contents = |response: &SearchResponse| {
            response
                .results
                .iter()
                .map(|r| (r.content.clone(), r.relevance_score))
                .collect::<Vec<_>>()
        };
        assert_eq!(contents(&first), contents(&second));
        assert_eq!(contents(&first), vec![
            ("a".to_string(), 0.9),
            ("c".to_string(), 0.85),
            ("b".to_string(), 0.8),
        ]);
    }
}
