//! Declarative catalog of invocable capabilities.
//!
//! The `FunctionRegistry` is loaded once at startup and never changes. It is
//! both the source of the parser's system prompt and the authority the
//! executor checks calls against.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{CommandError, Result};
use crate::spec::ParameterSpec;

/// Browser capability catalog shipped with the crate.
const BUILTIN_REGISTRY: &str = include_str!("../registry.json");

/// Declarative description of one invocable capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Unique function name.
    pub name: String,

    /// What the capability does, in plain words.
    pub description: String,

    /// Parameters in positional order.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    /// Example phrasings that should resolve to this entry.
    #[serde(default)]
    pub examples: Vec<String>,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }
}

/// Immutable, name-indexed set of registry entries.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    entries: Vec<RegistryEntry>,
    by_name: HashMap<String, usize>,
}

impl FunctionRegistry {
    /// Build a registry, rejecting duplicate function or parameter names.
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(CommandError::InvalidRegistry(format!(
                    "entry {position} has an empty name"
                )));
            }

            if by_name.insert(entry.name.clone(), position).is_some() {
                return Err(CommandError::InvalidRegistry(format!(
                    "duplicate function name: {}",
                    entry.name
                )));
            }

            let mut seen = HashSet::new();
            for parameter in &entry.parameters {
                if !seen.insert(parameter.name.as_str()) {
                    return Err(CommandError::InvalidRegistry(format!(
                        "duplicate parameter {} in {}",
                        parameter.name, entry.name
                    )));
                }
            }
        }

        debug!("Registry built with {} entries", entries.len());
        Ok(Self { entries, by_name })
    }

    /// Parse a JSON array of entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<RegistryEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load a registry file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let registry = Self::from_json(&content)?;
        info!("Loaded {} functions from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// The browser capability catalog bundled with this crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_REGISTRY)
    }

    /// Get an entry by name.
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
