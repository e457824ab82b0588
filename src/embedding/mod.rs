//! Embedding provider adapter
//!
//! Turns text into fixed-dimension vectors via the OpenAI embeddings API.
//! The `Embedder` trait is the seam the index adapter and tests plug into.

use crate::errors::{InboxError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Text-to-vector interface.
///
/// Implementations must be order-preserving: `result[i]` embeds `texts[i]`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a non-empty batch of texts, one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            n => Err(InboxError::Provider(format!(
                "expected 1 embedding, got {}",
                n
            ))),
        }
    }
}

/// HTTP client for the OpenAI embeddings endpoint
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(InboxError::Provider(
                "embedding request requires at least one text".to_string(),
            ));
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InboxError::Provider(format!(
                "embeddings API returned {}: {}",
                status, detail
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| InboxError::Provider(format!("malformed embeddings response: {}", e)))?;

        collect_embeddings(parsed.data, texts.len())
    }
}

/// Order the response items by their `index` field and verify the provider
/// returned exactly one vector per input.
fn collect_embeddings(mut items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if items.len() != expected {
        return Err(InboxError::Provider(format!(
            "embeddings response has {} items, expected {}",
            items.len(),
            expected
        )));
    }

    items.sort_by_key(|item| item.index);
    for (position, item) in items.iter().enumerate() {
        if item.index != position {
            return Err(InboxError::Provider(format!(
                "embeddings response is missing index {}",
                position
            )));
        }
    }

    Ok(items.into_iter().map(|item| item.embedding).collect())
}
