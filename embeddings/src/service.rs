//! Lazily initialized embedding service.
//!
//! The service owns a provider loader and builds the provider the first time
//! an embedding is requested. Concurrent first calls share one load.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest};
use crate::similarity::normalize;
use crate::{Embedding, QUANTIZATION_DIGITS};

/// Anything that can turn text into a stored-ready vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Builds an embedding provider. Called at most once per successful load.
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>>;
}

#[async_trait]
impl<F> ProviderLoader for F
where
    F: Fn() -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync,
{
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        (self)()
    }
}

/// Embedding service with a one-shot provider initialization guard.
///
/// A failed load leaves the cell empty, so the next call tries again.
pub struct EmbeddingService {
    loader: Box<dyn ProviderLoader>,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingService {
    /// Create a service that loads its provider on first use.
    pub fn lazy(loader: impl ProviderLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            provider: OnceCell::new(),
        }
    }

    /// Create a service around an already constructed provider.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let cloned = Arc::clone(&provider);
        Self {
            loader: Box::new(move || -> Result<Arc<dyn EmbeddingProvider>> {
                Ok(Arc::clone(&cloned))
            }),
            provider: OnceCell::new_with(Some(provider)),
        }
    }

    /// Whether the provider has been loaded.
    pub fn is_ready(&self) -> bool {
        self.provider.initialized()
    }

    /// Force the provider to load now.
    pub async fn warm_up(&self) -> Result<()> {
        self.provider().await.map(|_| ())
    }

    async fn provider(&self) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.provider
            .get_or_try_init(|| async {
                debug!("Loading embedding provider");
                match self.loader.load().await {
                    Ok(provider) => {
                        info!(
                            "Embedding provider ready: {} ({})",
                            provider.name(),
                            provider.default_model()
                        );
                        Ok(provider)
                    }
                    Err(e) => {
                        warn!("Embedding provider failed to load: {e}");
                        Err(e)
                    }
                }
            })
            .await
    }

    /// Embed many texts, one quantized vector per input.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let provider = self.provider().await?;
        let requests = texts.iter().map(EmbeddingRequest::new).collect();
        let responses = provider.embed_batch(requests).await?;
        responses
            .into_iter()
            .map(|r| prepare(r.embedding))
            .collect()
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let provider = self.provider().await?;
        let response = provider.embed(EmbeddingRequest::new(text)).await?;
        prepare(response.embedding)
    }
}

fn prepare(mut embedding: Embedding) -> Result<Embedding> {
    ensure_finite(&embedding)?;
    normalize(&mut embedding);
    ensure_finite(&embedding)?;
    quantize(&mut embedding);
    Ok(embedding)
}

fn ensure_finite(embedding: &[f32]) -> Result<()> {
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(EmbeddingError::InvalidResponse(
            "embedding has a non-finite component".to_string(),
        ));
    }
    Ok(())
}

/// Round every component to [`QUANTIZATION_DIGITS`] decimal places.
pub fn quantize(embedding: &mut [f32]) {
    let scale = 10f32.powi(QUANTIZATION_DIGITS);
    for x in embedding.iter_mut() {
        *x = (*x * scale).round() / scale;
    }
}
