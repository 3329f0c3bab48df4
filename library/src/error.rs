//! Error types for the library.

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Errors that can occur while saving, deleting, or searching items.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] assist_store::StoreError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] assist_embeddings::EmbeddingError),

    /// Registry error.
    #[error("registry error: {0}")]
    Command(#[from] assist_commands::CommandError),

    /// The operation needs an embedding provider and none is configured.
    #[error("embeddings are disabled")]
    EmbeddingsDisabled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for LibraryError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
