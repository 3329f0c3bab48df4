//! Error types for the item store.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing tables.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A bookmark with the same URL is already stored under another id.
    #[error("bookmark url {url} already belongs to {existing_id}")]
    UrlConflict { url: String, existing_id: String },

    /// A table file exists but cannot be decoded.
    #[error("corrupt table file {path}: {message}")]
    Corrupt { path: String, message: String },

    /// Failed to write a table file.
    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
