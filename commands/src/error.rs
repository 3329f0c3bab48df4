//! Error types for command parsing and execution.

use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors raised while loading or assembling the command catalog.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Registry content violates an invariant.
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by [`CommandExecutor`](crate::CommandExecutor).
///
/// The first three mean the registry, the handler set, or the call disagree
/// with each other, which is a deployment defect. `Handler` carries whatever
/// the capability itself failed with.
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// The call names a function the registry does not declare.
    #[error("function {0} not found")]
    FunctionNotFound(String),

    /// The registry declares the function but no handler is bound.
    #[error("handler for {0} not found")]
    HandlerNotFound(String),

    /// An argument failed strict validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The handler failed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

/// Errors from the completion endpoint.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Endpoint answered with a non-success status.
    #[error("completion request failed: {0}")]
    Request(String),

    /// Response body did not have the expected shape.
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
