//! Table storage and persistence.
//!
//! A `Table` keeps every record in memory and, when backed by a file,
//! rewrites the whole table on each change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::records::Record;

/// Id-keyed records of one kind.
pub struct Table<R: Record> {
    /// Backing file, `None` for in-memory tables.
    path: Option<PathBuf>,

    rows: BTreeMap<String, R>,
}

impl<R: Record> Table<R> {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            rows: BTreeMap::new(),
        }
    }

    /// Open the table file `<dir>/<TABLE>.json`, starting empty if absent.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(format!("{}.json", R::TABLE));

        let rows = match fs::read_to_string(&path).await {
            Ok(content) => {
                let records: Vec<R> =
                    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                records
                    .into_iter()
                    .map(|record| (record.id().to_string(), record))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Loaded {} {} from {}", rows.len(), R::TABLE, path.display());
        Ok(Self {
            path: Some(path),
            rows,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &R> {
        self.rows.values()
    }

    /// Records for `ids`, in the order given. Unknown ids are skipped.
    pub fn get_many(&self, ids: &[String]) -> Vec<&R> {
        ids.iter().filter_map(|id| self.rows.get(id)).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or replace a record.
    ///
    /// If the table file cannot be written the in-memory table is left as
    /// it was before the call.
    pub async fn put(&mut self, record: R) -> Result<()> {
        let id = record.id().to_string();
        let previous = self.rows.insert(id.clone(), record);

        if let Err(e) = self.flush().await {
            match previous {
                Some(previous) => self.rows.insert(id, previous),
                None => self.rows.remove(&id),
            };
            return Err(e);
        }

        debug!("Saved {} record {id}", R::TABLE);
        Ok(())
    }

    /// Remove a record. Removing an unknown id succeeds and returns `None`.
    pub async fn delete(&mut self, id: &str) -> Result<Option<R>> {
        let Some(removed) = self.rows.remove(id) else {
            return Ok(None);
        };

        if let Err(e) = self.flush().await {
            self.rows.insert(id.to_string(), removed);
            return Err(e);
        }

        debug!("Deleted {} record {id}", R::TABLE);
        Ok(Some(removed))
    }

    /// Remove every listed record with a single write.
    pub async fn delete_many(&mut self, ids: &[String]) -> Result<Vec<R>> {
        let removed: Vec<R> = ids.iter().filter_map(|id| self.rows.remove(id)).collect();
        if removed.is_empty() {
            return Ok(removed);
        }

        if let Err(e) = self.flush().await {
            for record in removed {
                self.rows.insert(record.id().to_string(), record);
            }
            return Err(e);
        }

        debug!("Deleted {} {} records", removed.len(), R::TABLE);
        Ok(removed)
    }

    /// Write the table file atomically.
    async fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let records: Vec<&R> = self.rows.values().collect();
        let content = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|source| StoreError::WriteFile {
                path: temp_path.display().to_string(),
                source,
            })?;
        fs::rename(&temp_path, path)
            .await
            .map_err(|source| StoreError::WriteFile {
                path: path.display().to_string(),
                source,
            })?;

        Ok(())
    }
}
