//! Saved outputs and bookmarks with semantic search.
//!
//! Saving is two-phase: the record is committed first, then its embedding is
//! computed and stored. Only the first phase can fail a save; an embedding
//! that could not be produced is reported as [`Enrichment::Skipped`] and can
//! be filled in later by [`Library::reindex_missing`].

use std::sync::Arc;

use assist_embeddings::{Embedder, EmbeddingError, EmbeddingStore, SemanticIndex};
use assist_store::{Bookmark, Database, Output};
use tracing::{debug, info, warn};

use crate::config::AssistConfig;
use crate::error::{LibraryError, Result};

/// Outcome of the embedding phase of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// The embedding was stored.
    Indexed,

    /// The record was saved without an embedding.
    Skipped { reason: String },
}

impl Enrichment {
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed)
    }
}

/// A committed record and what happened to its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<T> {
    pub item: T,
    pub enrichment: Enrichment,
}

/// Counts from [`Library::reindex_missing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: usize,
}

/// The assistant's saved items.
pub struct Library {
    db: Arc<Database>,
    index: Option<SemanticIndex>,
}

impl Library {
    /// Create a library over `db`. Without an embedder, saves skip
    /// enrichment and searches return items in list order.
    pub fn new(db: Arc<Database>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        let index = embedder.map(|embedder| {
            let store: Arc<dyn EmbeddingStore> = db.clone();
            SemanticIndex::new(embedder, store)
        });
        Self { db, index }
    }

    /// Open the database and embedding service described by `config`.
    pub async fn open(config: &AssistConfig) -> Result<Self> {
        let db = if config.storage.in_memory {
            Database::in_memory()
        } else {
            Database::open(&config.storage.data_dir).await?
        };

        let embedder = config
            .embedding
            .service()
            .map(|service| Arc::new(service) as Arc<dyn Embedder>);
        if embedder.is_none() {
            info!("Embeddings disabled; search falls back to list order");
        }

        Ok(Self::new(Arc::new(db), embedder))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn has_embeddings(&self) -> bool {
        self.index.is_some()
    }

    /// Save an output, then try to index it.
    pub async fn save_output(&self, output: Output) -> Result<Saved<Output>> {
        self.db.put_output(output.clone()).await?;
        debug!("Saved {} output {}", output.kind, output.id);

        let enrichment = self.enrich(&output.id, &output.search_text()).await;
        Ok(Saved {
            item: output,
            enrichment,
        })
    }

    /// Save a bookmark, then try to index it.
    ///
    /// Fails with a store error when another bookmark has the same URL.
    pub async fn save_bookmark(&self, bookmark: Bookmark) -> Result<Saved<Bookmark>> {
        self.db.put_bookmark(bookmark.clone()).await?;
        debug!("Saved bookmark {} ({})", bookmark.id, bookmark.url);

        let enrichment = self.enrich(&bookmark.id, &bookmark.search_text()).await;
        Ok(Saved {
            item: bookmark,
            enrichment,
        })
    }

    async fn enrich(&self, id: &str, text: &str) -> Enrichment {
        let Some(index) = &self.index else {
            return Enrichment::Skipped {
                reason: "embeddings are disabled".to_string(),
            };
        };

        match index.index(id, text).await {
            Ok(()) => Enrichment::Indexed,
            Err(e) => {
                warn!("Saved {id} without an embedding: {e}");
                Enrichment::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Delete an output and its embedding. Deleting an unknown id succeeds.
    pub async fn delete_output(&self, id: &str) -> Result<bool> {
        Ok(self.db.delete_output(id).await?)
    }

    /// Delete a bookmark and its embedding. Deleting an unknown id succeeds.
    pub async fn delete_bookmark(&self, id: &str) -> Result<bool> {
        Ok(self.db.delete_bookmark(id).await?)
    }

    /// Every output, newest first.
    pub async fn outputs(&self) -> Vec<Output> {
        self.db.outputs().await
    }

    /// Every bookmark, newest first.
    pub async fn bookmarks(&self) -> Vec<Bookmark> {
        self.db.bookmarks().await
    }

    /// All outputs, most similar to `query` first.
    ///
    /// Falls back to list order when the query cannot be embedded.
    pub async fn search_outputs(&self, query: &str) -> Result<Vec<Output>> {
        let outputs = self.db.outputs().await;
        let Some(index) = &self.index else {
            return Ok(outputs);
        };

        let ids: Vec<String> = outputs.iter().map(|o| o.id.clone()).collect();
        match index.search(query, &ids).await {
            Ok(ranked) => Ok(self.db.get_outputs(&ranked).await),
            Err(e @ EmbeddingError::Store(_)) => Err(e.into()),
            Err(e) => {
                warn!("Query could not be embedded, listing outputs unranked: {e}");
                Ok(outputs)
            }
        }
    }

    /// All bookmarks, most similar to `query` first.
    ///
    /// Falls back to list order when the query cannot be embedded.
    pub async fn search_bookmarks(&self, query: &str) -> Result<Vec<Bookmark>> {
        let bookmarks = self.db.bookmarks().await;
        let Some(index) = &self.index else {
            return Ok(bookmarks);
        };

        let ids: Vec<String> = bookmarks.iter().map(|b| b.id.clone()).collect();
        match index.search(query, &ids).await {
            Ok(ranked) => Ok(self.db.get_bookmarks(&ranked).await),
            Err(e @ EmbeddingError::Store(_)) => Err(e.into()),
            Err(e) => {
                warn!("Query could not be embedded, listing bookmarks unranked: {e}");
                Ok(bookmarks)
            }
        }
    }

    /// Embed every output and bookmark that has no stored embedding.
    pub async fn reindex_missing(&self) -> Result<ReindexReport> {
        let Some(index) = &self.index else {
            return Err(LibraryError::EmbeddingsDisabled);
        };

        let mut pending: Vec<(String, String)> = self
            .db
            .outputs_without_embedding()
            .await
            .into_iter()
            .map(|o| {
                let text = o.search_text();
                (o.id, text)
            })
            .collect();
        pending.extend(
            self.db
                .bookmarks_without_embedding()
                .await
                .into_iter()
                .map(|b| {
                    let text = b.search_text();
                    (b.id, text)
                }),
        );

        let mut report = ReindexReport::default();
        for (id, text) in pending {
            match index.index(&id, &text).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    warn!("Failed to index {id}: {e}");
                    report.failed += 1;
                }
            }
        }

        info!(
            "Reindexed {} items ({} failed)",
            report.indexed, report.failed
        );
        Ok(report)
    }

    /// Remove embeddings left behind by interrupted deletes.
    pub async fn prune_orphans(&self) -> Result<usize> {
        Ok(self.db.prune_orphan_embeddings().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_embeddings::Embedding;
    use assist_store::OutputKind;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Always fails, like an endpoint that is not running.
    struct OfflineEmbedder;

    #[async_trait]
    impl Embedder for OfflineEmbedder {
        async fn embed(&self, _text: &str) -> assist_embeddings::Result<Embedding> {
            Err(EmbeddingError::ModelUnavailable("connection refused".to_string()))
        }
    }

    fn offline_library() -> Library {
        Library::new(
            Arc::new(Database::in_memory()),
            Some(Arc::new(OfflineEmbedder)),
        )
    }

    #[tokio::test]
    async fn test_offline_embedder_skips_enrichment() {
        let library = offline_library();

        let saved = library
            .save_output(Output::new(OutputKind::Summary, "short"))
            .await
            .unwrap();

        assert!(matches!(
            saved.enrichment,
            Enrichment::Skipped { ref reason } if reason.contains("connection refused")
        ));
        assert_eq!(library.outputs().await, vec![saved.item]);
        assert_eq!(library.database().embedding_count().await, 0);
    }

    #[tokio::test]
    async fn test_offline_search_lists_unranked() {
        let library = offline_library();
        let older = library
            .save_bookmark(Bookmark::new("https://a.example", "A"))
            .await
            .unwrap();
        let newer = library
            .save_output(Output::new(OutputKind::Summary, "notes"))
            .await
            .unwrap();

        assert_eq!(
            library.search_bookmarks("anything").await.unwrap(),
            vec![older.item]
        );
        assert_eq!(
            library.search_outputs("anything").await.unwrap(),
            vec![newer.item]
        );
    }

    #[tokio::test]
    async fn test_without_embedder_search_keeps_list_order() {
        let library = Library::new(Arc::new(Database::in_memory()), None);
        let saved = library
            .save_bookmark(Bookmark::new("https://a.example", "A"))
            .await
            .unwrap();

        assert_eq!(
            saved.enrichment,
            Enrichment::Skipped {
                reason: "embeddings are disabled".to_string()
            }
        );
        assert_eq!(
            library.search_bookmarks("anything").await.unwrap(),
            vec![saved.item]
        );
        assert!(matches!(
            library.reindex_missing().await,
            Err(LibraryError::EmbeddingsDisabled)
        ));
    }
}
