//! Embedding providers.
//!
//! A provider turns text into a raw dense vector. Pooling and normalization
//! are the provider's concern; quantization happens in
//! [`EmbeddingService`](crate::EmbeddingService).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Generate a mean-pooled embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        // Default implementation: process sequentially
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.embed(request).await?);
        }
        Ok(results)
    }
}

/// Provider for OpenAI-compatible `/embeddings` endpoints.
///
/// Local inference servers (Ollama, llama.cpp, text-embeddings-inference)
/// expose the same shape, so the default points at a loopback address and
/// the API key is optional.
pub struct HttpProvider {
    /// API key, sent as a bearer token when present.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,
}

impl HttpProvider {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:11434/v1";
    pub const DEFAULT_MODEL: &'static str = "all-minilm";

    /// Create a new provider against the default local endpoint.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            default_model: Self::DEFAULT_MODEL.to_string(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    async fn post(&self, body: serde_json::Value) -> Result<ApiEmbeddingResponse> {
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body);

        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "{status}: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }
}

impl Default for HttpProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Generating embedding with model: {model}");

        let result = self
            .post(serde_json::json!({
                "input": request.text,
                "model": model
            }))
            .await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        let dimension = embedding.len();
        debug!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model: result.model.unwrap_or(model),
            dimension,
        })
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let model = requests[0]
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let texts: Vec<&str> = requests.iter().map(|r| r.text.as_str()).collect();

        debug!(
            "Generating batch embeddings for {} texts with model: {model}",
            texts.len()
        );

        let result = self
            .post(serde_json::json!({
                "input": texts,
                "model": model
            }))
            .await?;

        if result.data.len() != requests.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                requests.len(),
                result.data.len()
            )));
        }

        let response_model = result.model.unwrap_or(model);
        let mut data = result.data;
        data.sort_by_key(|item| item.index);

        let responses: Vec<EmbeddingResponse> = data
            .into_iter()
            .map(|item| EmbeddingResponse {
                dimension: item.embedding.len(),
                embedding: item.embedding,
                model: response_model.clone(),
            })
            .collect();

        info!("Generated {} batch embeddings", responses.len());

        Ok(responses)
    }
}

/// OpenAI-compatible response format.
#[derive(Debug, Deserialize)]
struct ApiEmbeddingResponse {
    data: Vec<ApiEmbeddingData>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// On-device provider backed by `fastembed`.
///
/// `fastembed` mean-pools and L2-normalizes sentence-transformer outputs.
/// Inference runs on the blocking pool because the model needs `&mut`.
#[cfg(feature = "local")]
pub struct LocalProvider {
    model: std::sync::Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
    model_name: String,
}

#[cfg(feature = "local")]
impl LocalProvider {
    /// Load a model, downloading it into `cache_dir` if needed.
    ///
    /// This is the expensive step; wrap it in a
    /// [`ProviderLoader`](crate::ProviderLoader) so it happens once.
    pub fn load(model_name: &str, cache_dir: std::path::PathBuf) -> Result<Self> {
        let model_enum = match model_name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "all-minilm" => fastembed::EmbeddingModel::AllMiniLML6V2,
            "all-minilm-l6-v2-q" => fastembed::EmbeddingModel::AllMiniLML6V2Q,
            "bge-small-en-v1.5" => fastembed::EmbeddingModel::BGESmallENV15,
            other => {
                return Err(EmbeddingError::ModelUnavailable(format!(
                    "unsupported local model: {other}"
                )));
            }
        };

        let options = fastembed::InitOptions::new(model_enum).with_cache_dir(cache_dir);
        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        info!("Loaded local embedding model: {model_name}");

        Ok(Self {
            model: std::sync::Arc::new(std::sync::Mutex::new(model)),
            model_name: model_name.to_string(),
        })
    }
}

#[cfg(feature = "local")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn default_model(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = std::sync::Arc::clone(&self.model);
        let text = request.text;

        let embedding = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|e| {
                EmbeddingError::ModelUnavailable(format!("model lock poisoned: {e}"))
            })?;
            model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding returned".to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))??;

        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: self.model_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_embedding_request() {
        let request = EmbeddingRequest::new("Hello world").with_model("all-minilm");

        assert_eq!(request.text, "Hello world");
        assert_eq!(request.model, Some("all-minilm".to_string()));
    }

    #[tokio::test]
    async fn test_http_embed_parses_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(serde_json::json!({"input": "hello", "model": "all-minilm"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "all-minilm",
                "data": [{"index": 0, "embedding": [0.25, 0.5, 0.75]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpProvider::new().with_base_url(server.uri());
        let response = provider.embed(EmbeddingRequest::new("hello")).await.unwrap();

        assert_eq!(response.embedding, vec![0.25, 0.5, 0.75]);
        assert_eq!(response.dimension, 3);
        assert_eq!(response.model, "all-minilm");
    }

    #[tokio::test]
    async fn test_http_sends_bearer_only_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpProvider::new()
            .with_base_url(format!("{}/", server.uri()))
            .with_api_key("sk-test");
        let response = provider.embed(EmbeddingRequest::new("x")).await.unwrap();

        assert_eq!(response.model, HttpProvider::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_http_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = HttpProvider::new().with_base_url(server.uri());
        let err = provider.embed(EmbeddingRequest::new("x")).await.unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::RateLimited {
                retry_after_secs: 7
            }
        ));
    }

    #[tokio::test]
    async fn test_http_batch_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [2.0]},
                    {"index": 0, "embedding": [1.0]}
                ]
            })))
            .mount(&server)
            .await;

        let provider = HttpProvider::new().with_base_url(server.uri());
        let responses = provider
            .embed_batch(vec![EmbeddingRequest::new("a"), EmbeddingRequest::new("b")])
            .await
            .unwrap();

        let vectors: Vec<Embedding> = responses.into_iter().map(|r| r.embedding).collect();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }
}
