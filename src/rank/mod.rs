//! Ranking stage
//!
//! Second-pass relevance scoring of retrieved candidates through the Cohere
//! rerank API. Stateless: output is a pure function of (query, candidates),
//! always a subset of the candidates in descending relevance order.

use crate::errors::{InboxError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const COHERE_BASE_URL: &str = "https://api.cohere.com";

/// HTTP client for the Cohere rerank endpoint
pub struct CohereReranker {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

impl CohereReranker {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: COHERE_BASE_URL.to_string(),
        }
    }

    /// Reorder `candidates` by relevance to `query`, keeping at most `top_n`.
    ///
    /// An empty candidate list short-circuits without a remote call; the
    /// rerank API rejects empty document lists.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<String>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/v2/rerank", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "query": query,
                "documents": candidates,
                "top_n": top_n,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InboxError::Provider(format!(
                "rerank API returned {}: {}",
                status, detail
            )));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| InboxError::Provider(format!("malformed rerank response: {}", e)))?;

        Ok(select_ranked(candidates, parsed.results, top_n))
    }
}

/// Map rerank results back to candidate texts: descending relevance score,
/// out-of-range and duplicate indices dropped, at most `top_n` kept.
fn select_ranked(candidates: &[String], mut results: Vec<RerankResult>, top_n: usize) -> Vec<String> {
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen = vec![false; candidates.len()];
    let mut ranked = Vec::new();
    for result in results {
        if ranked.len() >= top_n {
            break;
        }
        if let Some(text) = candidates.get(result.index) {
            if !seen[result.index] {
                seen[result.index] = true;
                ranked.push(text.clone());
            }
        }
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn result(index: usize, relevance_score: f32) -> RerankResult {
        RerankResult {
            index,
            relevance_score,
        }
    }

    fn candidates(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("candidate {}", i)).collect()
    }

    #[test]
    fn test_select_orders_by_relevance() {
        let texts = candidates(3);
        let results = vec![result(0, 0.1), result(2, 0.9), result(1, 0.5)];
        let ranked = select_ranked(&texts, results, 3);
        assert_eq!(ranked, vec!["candidate 2", "candidate 1", "candidate 0"]);
    }

    #[test]
    fn test_select_respects_top_n() {
        let texts = candidates(5);
        let results = (0..5).map(|i| result(i, i as f32)).collect();
        let ranked = select_ranked(&texts, results, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], "candidate 4");
    }

    #[test]
    fn test_select_drops_out_of_range_and_duplicate_indices() {
        let texts = candidates(2);
        let results = vec![result(7, 0.9), result(1, 0.8), result(1, 0.7), result(0, 0.1)];
        let ranked = select_ranked(&texts, results, 5);
        assert_eq!(ranked, vec!["candidate 1", "candidate 0"]);
    }

    #[tokio::test]
    async fn test_empty_candidates_short_circuit() {
        // Never touches the network for empty input
        let reranker = CohereReranker::new("test-key", "rerank-english-v3.0");
        let ranked = reranker.rerank("anything", &[], 5).await.unwrap();
        assert!(ranked.is_empty());
    }

    #[quickcheck]
    fn prop_ranked_is_permutation_subset(scores: Vec<(usize, f32)>, top_n: usize) -> bool {
        let texts = candidates(8);
        let results = scores
            .into_iter()
            .map(|(i, s)| result(i % 16, if s.is_finite() { s } else { 0.0 }))
            .collect();
        let ranked = select_ranked(&texts, results, top_n);

        ranked.len() <= top_n
            && ranked.len() <= texts.len()
            && ranked.iter().all(|t| texts.contains(t))
            && {
                let mut unique = ranked.clone();
                unique.sort();
                unique.dedup();
                unique.len() == ranked.len()
            }
    }

    #[quickcheck]
    fn prop_full_results_keep_min_of_top_n_and_len(len: usize, top_n: usize) -> bool {
        let len = len % 32;
        let texts = candidates(len);
        let results = (0..len).map(|i| result(i, i as f32)).collect();
        let ranked = select_ranked(&texts, results, top_n);
        ranked.len() == top_n.min(len)
    }

    #[tokio::test]
    #[ignore] // Requires COHERE_API_KEY
    async fn test_rerank_live() {
        let key = std::env::var("COHERE_API_KEY").unwrap();
        let reranker = CohereReranker::new(key, "rerank-english-v3.0");
        let texts = vec![
            "invoice for $100 from the electric company".to_string(),
            "lunch menu for the office party".to_string(),
        ];
        let ranked = reranker
            .rerank("what is the invoice amount", &texts, 2)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].contains("invoice"));
    }
}
