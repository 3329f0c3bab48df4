//! Configuration for the browser assistant.
//!
//! Read from a TOML file; every field has a default, so an empty or missing
//! file gives a working loopback setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assist_commands::{ChatCompletionsModel, ExecutorOptions, FunctionRegistry, ModelSettings};
use assist_embeddings::{EmbeddingProvider, EmbeddingService, HttpProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};

/// Directory name used under the platform data and config directories.
pub const APP_DIR: &str = "browser-assist";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub commands: CommandsConfig,
}

impl AssistConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match tokio::fs::try_exists(path).await {
            Ok(true) => Self::load(path).await,
            Ok(false) => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = dir.into();
        self
    }
}

/// Where saved items live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the table files.
    pub data_dir: PathBuf,

    /// Keep everything in memory and write nothing to disk.
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir().unwrap_or_default().join(APP_DIR),
            in_memory: false,
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
    /// On-device model (requires the `local` feature).
    Local,
    /// No embeddings; saves skip enrichment and searches keep list order.
    None,
}

/// Embedding backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,

    /// Endpoint for the HTTP provider.
    pub base_url: String,

    /// Model name; provider default when unset.
    pub model: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,

    /// Model download directory for the local provider.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Http,
            base_url: HttpProvider::DEFAULT_BASE_URL.to_string(),
            model: None,
            api_key_env: None,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    /// Build a lazily loading service, or `None` when embeddings are off.
    ///
    /// Nothing is contacted or downloaded until the first embedding.
    pub fn service(&self) -> Option<EmbeddingService> {
        let config = self.clone();
        match self.provider {
            EmbeddingProviderType::None => None,
            EmbeddingProviderType::Http => Some(EmbeddingService::lazy(
                move || -> assist_embeddings::Result<Arc<dyn EmbeddingProvider>> {
                    let mut provider = HttpProvider::new().with_base_url(&config.base_url);
                    if let Some(model) = &config.model {
                        provider = provider.with_model(model);
                    }
                    if let Some(key) = read_api_key(config.api_key_env.as_deref()) {
                        provider = provider.with_api_key(key);
                    }
                    Ok(Arc::new(provider))
                },
            )),
            EmbeddingProviderType::Local => Some(EmbeddingService::lazy(move || {
                load_local(&config)
            })),
        }
    }
}

#[cfg(feature = "local")]
fn load_local(config: &EmbeddingConfig) -> assist_embeddings::Result<Arc<dyn EmbeddingProvider>> {
    let model = config.model.as_deref().unwrap_or("all-minilm-l6-v2");
    let cache_dir = config
        .cache_dir
        .clone()
        .unwrap_or_else(|| dirs::cache_dir().unwrap_or_default().join(APP_DIR).join("models"));
    let provider = assist_embeddings::LocalProvider::load(model, cache_dir)?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "local"))]
fn load_local(_config: &EmbeddingConfig) -> assist_embeddings::Result<Arc<dyn EmbeddingProvider>> {
    Err(assist_embeddings::EmbeddingError::ModelUnavailable(
        "built without the local feature".to_string(),
    ))
}

/// Completion endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub top_k: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let settings = ModelSettings::default();
        Self {
            base_url: ChatCompletionsModel::DEFAULT_BASE_URL.to_string(),
            model: ChatCompletionsModel::DEFAULT_MODEL.to_string(),
            api_key_env: None,
            temperature: settings.temperature,
            top_k: settings.top_k,
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> ChatCompletionsModel {
        let mut model = ChatCompletionsModel::new()
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_settings(ModelSettings {
                temperature: self.temperature,
                top_k: self.top_k,
            });
        if let Some(key) = read_api_key(self.api_key_env.as_deref()) {
            model = model.with_api_key(key);
        }
        model
    }
}

/// Command catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Registry file; the caller's bundled registry when unset.
    pub registry: Option<PathBuf>,

    /// Type-check arguments before invoking handlers.
    pub validate_arguments: bool,
}

impl CommandsConfig {
    /// Load the configured registry, or parse `bundled` when none is set.
    pub async fn registry(&self, bundled: &str) -> Result<FunctionRegistry> {
        let registry = match &self.registry {
            Some(path) => FunctionRegistry::load(path).await?,
            None => FunctionRegistry::from_json(bundled)?,
        };
        if registry.is_empty() {
            return Err(LibraryError::Config("registry has no entries".to_string()));
        }
        Ok(registry)
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            validate_arguments: self.validate_arguments,
        }
    }
}

fn read_api_key(env_name: Option<&str>) -> Option<String> {
    let name = env_name?;
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => Some(key),
        _ => {
            warn!("API key variable {name} is not set");
            None
        }
    }
}
