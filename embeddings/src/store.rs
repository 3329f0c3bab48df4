//! Persistence seam for embedding records.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Embedding;
use crate::error::Result;

/// The stored vector for one saved output or bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Id of the owning output or bookmark.
    pub id: String,

    /// Quantized embedding.
    pub embedding: Embedding,
}

impl EmbeddingRecord {
    pub fn new(id: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            id: id.into(),
            embedding,
        }
    }
}

/// Key-value access to embedding records.
///
/// Every method is atomic for a single record. Deleting an unknown id
/// succeeds.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Insert or replace the record with the same id.
    async fn put_embedding(&self, record: EmbeddingRecord) -> Result<()>;

    /// Fetch one record.
    async fn get_embedding(&self, id: &str) -> Result<Option<EmbeddingRecord>>;

    /// Fetch the records for `ids`. Unknown ids are left out.
    async fn get_embeddings(&self, ids: &[String]) -> Result<Vec<EmbeddingRecord>>;

    /// Remove a record if it exists.
    async fn delete_embedding(&self, id: &str) -> Result<()>;
}

/// In-process store, mostly useful for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryEmbeddingStore {
    records: RwLock<HashMap<String, Embedding>>,
}

impl MemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn put_embedding(&self, record: EmbeddingRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id, record.embedding);
        Ok(())
    }

    async fn get_embedding(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(id)
            .map(|embedding| EmbeddingRecord::new(id, embedding.clone())))
    }

    async fn get_embeddings(&self, ids: &[String]) -> Result<Vec<EmbeddingRecord>> {
        let records = self.records.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                records
                    .get(id)
                    .map(|embedding| EmbeddingRecord::new(id.as_str(), embedding.clone()))
            })
            .collect())
    }

    async fn delete_embedding(&self, id: &str) -> Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_put_then_get_returns_exact_vector() {
        let store = MemoryEmbeddingStore::new();
        store
            .put_embedding(EmbeddingRecord::new("x", vec![0.125, -0.5, 0.333]))
            .await
            .unwrap();

        let record = store.get_embedding("x").await.unwrap().unwrap();
        assert_eq!(record.embedding, vec![0.125, -0.5, 0.333]);
    }

    #[tokio::test]
    async fn test_second_write_wins() {
        let store = MemoryEmbeddingStore::new();
        store
            .put_embedding(EmbeddingRecord::new("x", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .put_embedding(EmbeddingRecord::new("x", vec![0.0, 1.0]))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let record = store.get_embedding("x").await.unwrap().unwrap();
        assert_eq!(record.embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let store = MemoryEmbeddingStore::new();
        store
            .put_embedding(EmbeddingRecord::new("a", vec![1.0]))
            .await
            .unwrap();

        let found = store
            .get_embeddings(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec![EmbeddingRecord::new("a", vec![1.0])]);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_ok() {
        let store = MemoryEmbeddingStore::new();
        store.delete_embedding("never-written").await.unwrap();
        assert!(store.is_empty().await);
    }
}
