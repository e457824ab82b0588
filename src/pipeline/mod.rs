//! Pipeline orchestrator
//!
//! Composes the adapters into the two top-level operations:
//!
//! - `ingest`: fetch -> embed (batched) -> upsert
//! - `ask`: query -> rerank -> generate
//!
//! A fetch failure aborts ingestion before anything is written; per-record
//! embed/upsert failures are contained and reported in the `IngestReport`.

use crate::config::{Config, Secrets};
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::errors::Result;
use crate::generator::AnswerGenerator;
use crate::index::{EmailIndex, IndexEntry, UpsertReport};
use crate::mail::{EmailRecord, GmailAuth, MailClient, TokenStore};
use crate::rank::CohereReranker;
use std::sync::Arc;

/// Aggregate outcome of one ingestion run
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Messages fetched and normalized from the mail source
    pub fetched: usize,
    /// Ids successfully written to the index
    pub indexed: Vec<String>,
    /// Ids that failed to embed or upsert, with reasons
    pub failed: Vec<(String, String)>,
}

/// The email Q&A pipeline
pub struct Pipeline {
    mail: MailClient,
    embedder: Arc<dyn Embedder>,
    index: EmailIndex,
    reranker: CohereReranker,
    generator: AnswerGenerator,
    config: Config,
}

impl Pipeline {
    /// Wire up all adapters from explicit configuration and secrets.
    pub fn new(config: Config, secrets: Secrets) -> Result<Self> {
        let store = TokenStore::new(config.token_path()?);
        let mail = MailClient::new(GmailAuth::new(store));

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(
            secrets.openai_api_key.clone(),
            config.models.embedding.clone(),
        ));

        let index = EmailIndex::connect(
            &config.index,
            secrets.qdrant_api_key.clone(),
            Arc::clone(&embedder),
        )?;

        let reranker = CohereReranker::new(secrets.cohere_api_key, config.models.rerank.clone());
        let generator = AnswerGenerator::new(secrets.openai_api_key, config.models.chat.clone());

        Ok(Self {
            mail,
            embedder,
            index,
            reranker,
            generator,
            config,
        })
    }

    /// Fetch messages, embed them in batches, and upsert into the index.
    pub async fn ingest(&self) -> Result<IngestReport> {
        let records = self
            .mail
            .fetch(&self.config.mail.query, self.config.ingest.fetch_concurrency)
            .await?;

        self.index.ensure_collection().await?;

        let mut report = IngestReport {
            fetched: records.len(),
            ..Default::default()
        };

        let batch_size = self.config.ingest.embed_batch_size.max(1);
        for batch in records.chunks(batch_size) {
            match self.index_batch(batch).await {
                Ok(outcome) => {
                    report.indexed.extend(outcome.succeeded);
                    report.failed.extend(outcome.failed);
                }
                Err(e) => {
                    // Embedding the whole batch failed; contain it and move on
                    tracing::error!(error = %e, count = batch.len(), "embedding batch failed");
                    let reason = e.to_string();
                    report
                        .failed
                        .extend(batch.iter().map(|r| (r.id.clone(), reason.clone())));
                }
            }
        }

        tracing::info!(
            fetched = report.fetched,
            indexed = report.indexed.len(),
            failed = report.failed.len(),
            "ingestion complete"
        );
        Ok(report)
    }

    async fn index_batch(&self, records: &[EmailRecord]) -> Result<UpsertReport> {
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let entries: Vec<IndexEntry> = records
            .iter()
            .zip(vectors)
            .map(|(record, vector)| IndexEntry {
                id: record.id.clone(),
                vector,
                text: record.text.clone(),
            })
            .collect();

        Ok(self.index.upsert(entries).await)
    }

    /// Answer a question from the indexed emails: retrieve the nearest
    /// candidates, re-rank them, and generate. With an empty index the
    /// generator simply runs with no context.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let hits = self
            .index
            .query(question, self.config.retrieval.top_k)
            .await?;
        tracing::info!(count = hits.len(), "retrieved candidate emails");

        let candidates: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();

        let ranked = self
            .reranker
            .rerank(question, &candidates, self.config.retrieval.top_n)
            .await?;
        tracing::debug!(count = ranked.len(), "candidates after re-ranking");

        self.generator.answer(question, &ranked).await
    }

    /// The underlying index, for maintenance operations (count, delete).
    pub fn index(&self) -> &EmailIndex {
        &self.index
    }
}
