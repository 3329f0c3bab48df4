//! # Library
//!
//! Everything the assistant keeps between sessions, and the configuration
//! that wires it together:
//!
//! - **Outputs**: generated text, listed newest first
//! - **Bookmarks**: saved pages, unique by URL
//! - **Search**: every item ranked by embedding similarity to a query
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Library                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   save ──► Database (outputs / bookmarks) ──► SemanticIndex     │
//! │                                                   │             │
//! │   search ──► candidate ids ──► SemanticIndex ─────┤             │
//! │                                                   ▼             │
//! │                                   Database (embeddings)         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assist_library::{AssistConfig, Library};
//!
//! let config = AssistConfig::load_or_default(AssistConfig::default_path()).await?;
//! let library = Library::open(&config).await?;
//!
//! let saved = library.save_bookmark(Bookmark::new(url, title)).await?;
//! let matches = library.search_bookmarks("sourdough starter").await?;
//! ```

pub mod config;
pub mod error;
pub mod library;

pub use config::{
    APP_DIR, AssistConfig, CommandsConfig, EmbeddingConfig, EmbeddingProviderType, LlmConfig,
    StorageConfig,
};
pub use error::{LibraryError, Result};
pub use library::{Enrichment, Library, ReindexReport, Saved};

// Re-export from dependencies for convenience
pub use assist_store::{Bookmark, Database, Output, OutputKind};
