//! Vector index adapter backed by Qdrant
//!
//! Owns the only persisted artifact under this system's control: one point
//! per email id, carrying the embedding vector plus the email text in the
//! payload. Upserting an existing id overwrites its vector and payload.
//!
//! Qdrant point ids must be UUIDs, so the Gmail message id is mapped to a
//! deterministic UUIDv5 and the original id is kept in the payload.

use crate::config::IndexConfig;
use crate::embedding::Embedder;
use crate::errors::Result;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        points_selector::PointsSelectorOneOf, vectors_config::Config,
        with_payload_selector::SelectorOptions, CreateCollection, Distance, Filter, PointId,
        PointStruct, PointsIdsList, PointsSelector, SearchPoints, Value as QdrantValue,
        VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Points per upsert request
const UPSERT_CHUNK: usize = 64;

/// One email ready for storage
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Gmail message id
    pub id: String,
    pub vector: Vec<f32>,
    /// Full email text stored in the payload
    pub text: String,
}

/// One similarity-search hit, ordered by descending cosine score
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Structured outcome of a best-effort batch upsert
#[derive(Debug, Default)]
pub struct UpsertReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl UpsertReport {
    pub fn merge(&mut self, other: UpsertReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

/// Qdrant-backed email index
pub struct EmailIndex {
    client: QdrantClient,
    collection: String,
    dimension: u64,
    embedder: Arc<dyn Embedder>,
}

impl EmailIndex {
    /// Connect to Qdrant. No remote call happens until an operation runs.
    pub fn connect(
        config: &IndexConfig,
        api_key: Option<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let client = QdrantClient::from_url(&config.url)
            .with_api_key(api_key)
            .build()?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension: config.dimension,
            embedder,
        })
    }

    /// Deterministic point id for a message id.
    pub fn point_id(message_id: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, message_id.as_bytes())
    }

    /// Create the collection if it does not exist. An existing collection is
    /// left untouched; a dimension mismatch surfaces as Qdrant's own error at
    /// upsert or search time.
    pub async fn ensure_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            tracing::info!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.dimension,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await?;

        tracing::info!(collection = %self.collection, "created collection");
        Ok(())
    }

    /// Best-effort upsert. A failing chunk is logged and recorded in the
    /// report; the remaining chunks continue.
    pub async fn upsert(&self, entries: Vec<IndexEntry>) -> UpsertReport {
        let mut report = UpsertReport::default();

        for chunk in entries.chunks(UPSERT_CHUNK) {
            let ids: Vec<String> = chunk.iter().map(|e| e.id.clone()).collect();
            let points: Vec<PointStruct> = chunk
                .iter()
                .map(|entry| {
                    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                    payload.insert("text".to_string(), QdrantValue::from(entry.text.clone()));
                    payload.insert(
                        "message_id".to_string(),
                        QdrantValue::from(entry.id.clone()),
                    );
                    PointStruct::new(
                        Self::point_id(&entry.id).to_string(),
                        entry.vector.clone(),
                        payload,
                    )
                })
                .collect();

            match self
                .client
                .upsert_points_blocking(&self.collection, None, points, None)
                .await
            {
                Ok(_) => report.succeeded.extend(ids),
                Err(e) => {
                    tracing::error!(error = %e, count = ids.len(), "upsert chunk failed");
                    let reason = e.to_string();
                    report
                        .failed
                        .extend(ids.into_iter().map(|id| (id, reason.clone())));
                }
            }
        }

        report
    }

    /// Embed `text` and return the `top_k` nearest emails.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed(text).await?;

        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector,
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                let id = point
                    .payload
                    .get("message_id")
                    .and_then(value_to_string)
                    .unwrap_or_default();
                let text = point
                    .payload
                    .get("text")
                    .and_then(value_to_string)
                    .unwrap_or_default();
                SearchHit {
                    id,
                    text,
                    score: point.score,
                }
            })
            .collect();

        Ok(hits)
    }

    /// Total vectors currently stored.
    pub async fn count(&self) -> Result<u64> {
        let info = self.client.collection_info(&self.collection).await?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    /// Delete one email by its message id.
    pub async fn delete(&self, message_id: &str) -> Result<()> {
        self.client
            .delete_points(
                &self.collection,
                None,
                &PointsSelector {
                    points_selector_one_of: Some(PointsSelectorOneOf::Points(PointsIdsList {
                        ids: vec![PointId::from(Self::point_id(message_id).to_string())],
                    })),
                },
                None,
            )
            .await?;

        tracing::info!(message_id, "deleted email from index");
        Ok(())
    }

    /// Delete every point in the collection. Irreversible; reachable only
    /// through an explicit call, never from a CLI flag.
    pub async fn delete_all(&self) -> Result<()> {
        tracing::warn!(collection = %self.collection, "deleting ALL emails from the index");

        // An empty filter matches every point
        self.client
            .delete_points_blocking(
                &self.collection,
                None,
                &PointsSelector {
                    points_selector_one_of: Some(PointsSelectorOneOf::Filter(Filter::default())),
                },
                None,
            )
            .await?;

        Ok(())
    }
}

fn value_to_string(value: &QdrantValue) -> Option<String> {
    use qdrant_client::qdrant::value::Kind;
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_deterministic() {
        let a = EmailIndex::point_id("18c0f0a2deadbeef");
        let b = EmailIndex::point_id("18c0f0a2deadbeef");
        assert_eq!(a, b);
    }

    #[test]
    fn test_point_id_distinct_per_message() {
        let a = EmailIndex::point_id("message-a");
        let b = EmailIndex::point_id("message-b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_report_merge() {
        let mut report = UpsertReport {
            succeeded: vec!["a".to_string()],
            failed: vec![],
        };
        report.merge(UpsertReport {
            succeeded: vec!["b".to_string()],
            failed: vec![("c".to_string(), "timeout".to_string())],
        });
        assert_eq!(report.succeeded, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(report.failed.len(), 1);
    }
}
