//! Embedding write path and similarity search over stored items.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::service::Embedder;
use crate::similarity::{SimilarityResult, rank_candidates};
use crate::store::{EmbeddingRecord, EmbeddingStore};

/// Joins an [`Embedder`] with an [`EmbeddingStore`].
#[derive(Clone)]
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn EmbeddingStore>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn EmbeddingStore>) -> Self {
        Self { embedder, store }
    }

    pub fn store(&self) -> &Arc<dyn EmbeddingStore> {
        &self.store
    }

    /// Embed `text` and upsert it under `id`.
    pub async fn index(&self, id: &str, text: &str) -> Result<()> {
        let embedding = self.embedder.embed(text).await?;
        debug!("Storing {}-dimension embedding for {id}", embedding.len());
        self.store
            .put_embedding(EmbeddingRecord::new(id, embedding))
            .await
    }

    /// Remove the embedding for `id`, if any.
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete_embedding(id).await
    }

    /// Rank `candidate_ids` by similarity to `query`.
    ///
    /// Ids without an embedding are appended after the ranked ones, so the
    /// result always contains every candidate.
    pub async fn search(&self, query: &str, candidate_ids: &[String]) -> Result<Vec<String>> {
        Ok(self
            .search_with_scores(query, candidate_ids)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps the scores.
    pub async fn search_with_scores(
        &self,
        query: &str,
        candidate_ids: &[String],
    ) -> Result<Vec<SimilarityResult>> {
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let vectors: HashMap<String, _> = self
            .store
            .get_embeddings(candidate_ids)
            .await?
            .into_iter()
            .map(|record| (record.id, record.embedding))
            .collect();

        debug!(
            "Ranking {} candidates, {} with embeddings",
            candidate_ids.len(),
            vectors.len()
        );

        Ok(rank_candidates(&query_embedding, candidate_ids, &vectors))
    }
}
