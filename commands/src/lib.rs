//! # Commands
//!
//! Turns a free-text instruction into a validated call against a fixed
//! catalog of browser capabilities, then runs the bound handler.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Command Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  user text ──► IntentParser ──► ParsedCall ──► CommandExecutor │
//! │                    │                               │            │
//! │                    ▼                               ▼            │
//! │             LanguageModel                     HandlerSet        │
//! │          (FunctionRegistry prompt)        (Capability impls)    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is declarative configuration; handlers are registered
//! explicitly at startup, so adding a capability never touches the
//! dispatcher.

pub mod error;
pub mod executor;
pub mod handler;
pub mod llm;
pub mod parser;
pub mod registry;
pub mod spec;

pub use error::{CommandError, ExecuteError, LlmError, Result};
pub use executor::{CommandExecutor, DONE_MESSAGE, ExecutorOptions};
pub use handler::{Capability, HandlerOutput, HandlerSet};
pub use llm::{ChatCompletionsModel, LanguageModel, ModelSettings};
pub use parser::{DecodeError, IntentParser, ParseError, ParsedCall, decode_call};
pub use registry::{FunctionRegistry, RegistryEntry};
pub use spec::{DataType, ParameterSpec};
