//! The three-table item database.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use assist_embeddings::{EmbeddingError, EmbeddingRecord, EmbeddingStore};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::records::{Bookmark, Output};
use crate::table::Table;

struct Tables {
    outputs: Table<Output>,
    bookmarks: Table<Bookmark>,
    embeddings: Table<EmbeddingRecord>,
}

/// Outputs, bookmarks, and their embeddings.
///
/// All three tables sit behind one lock, so an operation touching several
/// records (an item and its embedding) is not interleaved with other writes.
pub struct Database {
    dir: Option<PathBuf>,
    tables: RwLock<Tables>,
}

impl Database {
    /// Open or create the table files under `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        let tables = Tables {
            outputs: Table::open(&dir).await?,
            bookmarks: Table::open(&dir).await?,
            embeddings: Table::open(&dir).await?,
        };

        info!("Opened database at {}", dir.display());
        Ok(Self {
            dir: Some(dir),
            tables: RwLock::new(tables),
        })
    }

    /// A database that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            tables: RwLock::new(Tables {
                outputs: Table::in_memory(),
                bookmarks: Table::in_memory(),
                embeddings: Table::in_memory(),
            }),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    // Outputs

    pub async fn put_output(&self, output: Output) -> Result<()> {
        self.tables.write().await.outputs.put(output).await
    }

    pub async fn get_output(&self, id: &str) -> Option<Output> {
        self.tables.read().await.outputs.get(id).cloned()
    }

    /// Every output, newest first.
    pub async fn outputs(&self) -> Vec<Output> {
        let mut outputs: Vec<Output> = self.tables.read().await.outputs.all().cloned().collect();
        outputs.sort_by_key(|o| Reverse(o.timestamp));
        outputs
    }

    /// Outputs for `ids` in the order given, skipping unknown ids.
    pub async fn get_outputs(&self, ids: &[String]) -> Vec<Output> {
        self.tables
            .read()
            .await
            .outputs
            .get_many(ids)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Delete an output and its embedding. Returns whether the output existed.
    ///
    /// A failed embedding delete is logged and leaves an orphan for
    /// [`Database::prune_orphan_embeddings`].
    pub async fn delete_output(&self, id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.outputs.delete(id).await?;
        if let Err(e) = tables.embeddings.delete(id).await {
            warn!("Deleted {id} but kept its embedding: {e}");
        }
        Ok(removed.is_some())
    }

    // Bookmarks

    /// Insert or replace a bookmark.
    ///
    /// Fails with [`StoreError::UrlConflict`] when another bookmark already
    /// uses the same URL.
    pub async fn put_bookmark(&self, bookmark: Bookmark) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .bookmarks
            .all()
            .find(|b| b.url == bookmark.url && b.id != bookmark.id)
        {
            return Err(StoreError::UrlConflict {
                url: bookmark.url,
                existing_id: existing.id.clone(),
            });
        }
        tables.bookmarks.put(bookmark).await
    }

    pub async fn get_bookmark(&self, id: &str) -> Option<Bookmark> {
        self.tables.read().await.bookmarks.get(id).cloned()
    }

    pub async fn bookmark_by_url(&self, url: &str) -> Option<Bookmark> {
        self.tables
            .read()
            .await
            .bookmarks
            .all()
            .find(|b| b.url == url)
            .cloned()
    }

    /// Every bookmark, newest first.
    pub async fn bookmarks(&self) -> Vec<Bookmark> {
        let mut bookmarks: Vec<Bookmark> =
            self.tables.read().await.bookmarks.all().cloned().collect();
        bookmarks.sort_by_key(|b| Reverse(b.created_at));
        bookmarks
    }

    /// Bookmarks for `ids` in the order given, skipping unknown ids.
    pub async fn get_bookmarks(&self, ids: &[String]) -> Vec<Bookmark> {
        self.tables
            .read()
            .await
            .bookmarks
            .get_many(ids)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Delete a bookmark and its embedding. Returns whether the bookmark existed.
    ///
    /// A failed embedding delete is logged and leaves an orphan.
    pub async fn delete_bookmark(&self, id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.bookmarks.delete(id).await?;
        if let Err(e) = tables.embeddings.delete(id).await {
            warn!("Deleted {id} but kept its embedding: {e}");
        }
        Ok(removed.is_some())
    }

    // Embeddings

    /// Outputs with no stored embedding.
    pub async fn outputs_without_embedding(&self) -> Vec<Output> {
        let tables = self.tables.read().await;
        tables
            .outputs
            .all()
            .filter(|o| !tables.embeddings.contains(&o.id))
            .cloned()
            .collect()
    }

    /// Bookmarks with no stored embedding.
    pub async fn bookmarks_without_embedding(&self) -> Vec<Bookmark> {
        let tables = self.tables.read().await;
        tables
            .bookmarks
            .all()
            .filter(|b| !tables.embeddings.contains(&b.id))
            .cloned()
            .collect()
    }

    /// Remove embeddings whose output or bookmark no longer exists.
    pub async fn prune_orphan_embeddings(&self) -> Result<Vec<String>> {
        let mut tables = self.tables.write().await;
        let orphans: Vec<String> = tables
            .embeddings
            .ids()
            .filter(|id| !tables.outputs.contains(id) && !tables.bookmarks.contains(id))
            .map(ToString::to_string)
            .collect();

        let removed = tables.embeddings.delete_many(&orphans).await?;
        if !removed.is_empty() {
            info!("Pruned {} orphan embeddings", removed.len());
        }
        Ok(orphans)
    }

    pub async fn embedding_count(&self) -> usize {
        self.tables.read().await.embeddings.len()
    }
}

fn to_embedding_error(e: StoreError) -> EmbeddingError {
    EmbeddingError::Store(e.to_string())
}

#[async_trait]
impl EmbeddingStore for Database {
    async fn put_embedding(&self, record: EmbeddingRecord) -> assist_embeddings::Result<()> {
        debug!("Storing embedding for {}", record.id);
        self.tables
            .write()
            .await
            .embeddings
            .put(record)
            .await
            .map_err(to_embedding_error)
    }

    async fn get_embedding(&self, id: &str) -> assist_embeddings::Result<Option<EmbeddingRecord>> {
        Ok(self.tables.read().await.embeddings.get(id).cloned())
    }

    async fn get_embeddings(
        &self,
        ids: &[String],
    ) -> assist_embeddings::Result<Vec<EmbeddingRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .embeddings
            .get_many(ids)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn delete_embedding(&self, id: &str) -> assist_embeddings::Result<()> {
        self.tables
            .write()
            .await
            .embeddings
            .delete(id)
            .await
            .map(|_| ())
            .map_err(to_embedding_error)
    }
}
