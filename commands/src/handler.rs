//! Capability handlers and their registration.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::registry::FunctionRegistry;

/// What a capability returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutput {
    /// Success or failure flag.
    Flag(bool),

    /// Opaque payload, often HTML-ish markup for the side panel.
    Text(String),

    /// Nothing to show.
    Empty,
}

impl HandlerOutput {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for HandlerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Text(text) => f.write_str(text),
            Self::Empty => Ok(()),
        }
    }
}

impl From<bool> for HandlerOutput {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<String> for HandlerOutput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<String>> for HandlerOutput {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Empty, Self::Text)
    }
}

/// An executable capability.
///
/// Arguments arrive positionally, in the order the registry declares the
/// entry's parameters. A parameter the model did not supply is `Null`.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn invoke(&self, args: Vec<Value>) -> anyhow::Result<HandlerOutput>;
}

#[async_trait]
impl<F, Fut> Capability for F
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutput>> + Send + 'static,
{
    async fn invoke(&self, args: Vec<Value>) -> anyhow::Result<HandlerOutput> {
        (self)(args).await
    }
}

/// Handlers keyed by registry entry name.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<String, Arc<dyn Capability>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `capability` to the registry entry called `name`.
    ///
    /// A later registration for the same name replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, capability: impl Capability + 'static) {
        let name = name.into();
        debug!("Registered handler: {name}");
        self.handlers.insert(name, Arc::new(capability));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, capability: impl Capability + 'static) -> Self {
        self.register(name, capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registry entries that have no bound handler, in registry order.
    pub fn missing_for<'a>(&self, registry: &'a FunctionRegistry) -> Vec<&'a str> {
        registry
            .names()
            .filter(|name| !self.handlers.contains_key(*name))
            .collect()
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HandlerSet")
            .field("handlers", &names)
            .finish()
    }
}
