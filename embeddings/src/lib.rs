//! # Embeddings
//!
//! Semantic embeddings for saved outputs and bookmarks, and the similarity
//! search that ranks them against a free-text query.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense, quantized vectors
//! - **Lazy Providers**: The model is loaded once, on first use
//! - **Similarity Search**: Rank a candidate id set by cosine similarity
//! - **Tolerant Lookups**: Ids without a stored vector are kept, unranked
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► EmbeddingService ──► SemanticIndex      │
//! │       │                      │                   │             │
//! │       ▼                      ▼                   ▼             │
//! │  HTTP/Local            quantize()          EmbeddingStore      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod search;
pub mod service;
pub mod similarity;
pub mod store;

pub use error::{EmbeddingError, Result};
#[cfg(feature = "local")]
pub use provider::LocalProvider;
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HttpProvider};
pub use search::SemanticIndex;
pub use service::{Embedder, EmbeddingService, ProviderLoader, quantize};
pub use similarity::{SimilarityResult, cosine_similarity, rank_candidates};
pub use store::{EmbeddingRecord, EmbeddingStore, MemoryEmbeddingStore};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Number of decimal digits kept in every stored component.
pub const QUANTIZATION_DIGITS: i32 = 3;
