//! Call execution engine.
//!
//! The `CommandExecutor` binds a [`ParsedCall`] to its registry entry, lays
//! the named arguments out positionally, and runs the bound handler.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ExecuteError;
use crate::handler::{HandlerOutput, HandlerSet};
use crate::parser::ParsedCall;
use crate::registry::{FunctionRegistry, RegistryEntry};

/// Message returned in place of a bare `true` from a handler.
pub const DONE_MESSAGE: &str = "Done!";

/// Execution knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorOptions {
    /// Check each argument against its declared type before invoking.
    pub validate_arguments: bool,
}

impl ExecutorOptions {
    pub fn strict() -> Self {
        Self {
            validate_arguments: true,
        }
    }
}

/// Runs parsed calls against the registry and the handler set.
#[derive(Debug)]
pub struct CommandExecutor {
    registry: Arc<FunctionRegistry>,
    handlers: HandlerSet,
    options: ExecutorOptions,
}

impl CommandExecutor {
    pub fn new(registry: Arc<FunctionRegistry>, handlers: HandlerSet) -> Self {
        let missing = handlers.missing_for(&registry);
        if !missing.is_empty() {
            warn!("Registry entries without handlers: {}", missing.join(", "));
        }
        Self {
            registry,
            handlers,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    /// Execute `call`.
    ///
    /// Arguments are passed in the order the registry declares them,
    /// whatever order the call lists them in. Missing parameters are passed
    /// as `Null` and undeclared keys are dropped. A handler returning `true`
    /// yields [`DONE_MESSAGE`]; every other result passes through unchanged.
    pub async fn execute(&self, call: &ParsedCall) -> Result<HandlerOutput, ExecuteError> {
        let name = call.function_name.as_deref().unwrap_or_default();
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ExecuteError::FunctionNotFound(name.to_string()))?;
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ExecuteError::HandlerNotFound(name.to_string()))?;

        let args = self.bind_arguments(entry, call)?;
        debug!("Executing {name} with arguments: {args:?}");

        let start = Instant::now();
        let output = handler.invoke(args).await.inspect_err(|e| {
            warn!("Handler {name} failed: {e}");
        })?;
        info!("Executed {name} in {}ms", start.elapsed().as_millis());

        Ok(match output {
            HandlerOutput::Flag(true) => HandlerOutput::text(DONE_MESSAGE),
            other => other,
        })
    }

    fn bind_arguments(
        &self,
        entry: &RegistryEntry,
        call: &ParsedCall,
    ) -> Result<Vec<Value>, ExecuteError> {
        for key in call.parameters.keys() {
            if !entry.parameters.iter().any(|p| &p.name == key) {
                debug!("Ignoring undeclared argument {key} for {}", entry.name);
            }
        }

        entry
            .parameters
            .iter()
            .map(|parameter| {
                let value = call
                    .parameters
                    .get(&parameter.name)
                    .cloned()
                    .unwrap_or(Value::Null);
                if self.options.validate_arguments {
                    parameter.validate(&value).map_err(|reason| {
                        ExecuteError::InvalidArgument(format!("{}: {reason}", entry.name))
                    })?;
                }
                Ok(value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{DataType, ParameterSpec};
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};
    use std::sync::Mutex;

    fn call(name: &str, parameters: Value) -> ParsedCall {
        let Value::Object(parameters) = parameters else {
            panic!("parameters must be an object");
        };
        ParsedCall::new(name, parameters, 0.9)
    }

    fn pair_registry() -> Arc<FunctionRegistry> {
        Arc::new(
            FunctionRegistry::from_entries(vec![
                RegistryEntry::new("pair", "Takes two numbers")
                    .with_parameter(ParameterSpec::required("a", DataType::Number))
                    .with_parameter(ParameterSpec::required("b", DataType::Number)),
                RegistryEntry::new("toggle", "Flips something")
                    .with_parameter(ParameterSpec::required("enable", DataType::Boolean)),
                RegistryEntry::new("unbound", "Nothing handles this"),
            ])
            .unwrap(),
        )
    }

    fn recording_handlers(seen: Arc<Mutex<Vec<Vec<Value>>>>) -> HandlerSet {
        let pair_seen = seen.clone();
        HandlerSet::new()
            .with("pair", move |args: Vec<Value>| {
                pair_seen.lock().unwrap().push(args);
                async { anyhow::Ok(HandlerOutput::Flag(true)) }
            })
            .with("toggle", move |args: Vec<Value>| {
                seen.lock().unwrap().push(args.clone());
                async move { anyhow::Ok(HandlerOutput::Flag(args[0] == json!(true))) }
            })
    }

    #[tokio::test]
    async fn test_arguments_follow_declared_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = CommandExecutor::new(pair_registry(), recording_handlers(seen.clone()));

        executor
            .execute(&call("pair", json!({"b": 2, "a": 1})))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![vec![json!(1), json!(2)]]);
    }

    #[tokio::test]
    async fn test_missing_and_extra_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = CommandExecutor::new(pair_registry(), recording_handlers(seen.clone()));

        executor
            .execute(&call("pair", json!({"b": 2, "c": 3})))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![vec![Value::Null, json!(2)]]);
    }

    #[tokio::test]
    async fn test_true_becomes_done_and_false_passes_through() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = CommandExecutor::new(pair_registry(), recording_handlers(seen));

        let on = executor
            .execute(&call("toggle", json!({"enable": true})))
            .await
            .unwrap();
        let off = executor
            .execute(&call("toggle", json!({"enable": false})))
            .await
            .unwrap();

        assert_eq!(on, HandlerOutput::text(DONE_MESSAGE));
        assert_eq!(off, HandlerOutput::Flag(false));
    }

    #[tokio::test]
    async fn test_text_output_is_unchanged() {
        let registry = Arc::new(
            FunctionRegistry::from_entries(vec![RegistryEntry::new("show", "Show markup")])
                .unwrap(),
        );
        let handlers = HandlerSet::new().with("show", |_args: Vec<Value>| async {
            anyhow::Ok(HandlerOutput::text("<ul><li>a</li></ul>"))
        });
        let executor = CommandExecutor::new(registry, handlers);

        let output = executor.execute(&call("show", json!({}))).await.unwrap();
        assert_eq!(output, HandlerOutput::text("<ul><li>a</li></ul>"));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let executor = CommandExecutor::new(pair_registry(), HandlerSet::new());

        let err = executor
            .execute(&ParsedCall::new("rebootComputer", Map::new(), 1.0))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExecuteError::FunctionNotFound(ref name) if name == "rebootComputer"
        ));
        assert_eq!(err.to_string(), "function rebootComputer not found");
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = CommandExecutor::new(pair_registry(), recording_handlers(seen));

        let err = executor
            .execute(&call("unbound", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::HandlerNotFound(ref name) if name == "unbound"
        ));
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let registry = Arc::new(
            FunctionRegistry::from_entries(vec![RegistryEntry::new("explode", "Always fails")])
                .unwrap(),
        );
        let handlers = HandlerSet::new().with("explode", |_args: Vec<Value>| async {
            Err::<HandlerOutput, _>(anyhow::anyhow!("tab api unavailable"))
        });
        let executor = CommandExecutor::new(registry, handlers);

        let err = executor
            .execute(&call("explode", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecuteError::Handler(_)));
        assert_eq!(err.to_string(), "tab api unavailable");
    }

    #[tokio::test]
    async fn test_strict_validation_rejects_wrong_type() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = CommandExecutor::new(pair_registry(), recording_handlers(seen.clone()))
            .with_options(ExecutorOptions::strict());

        let err = executor
            .execute(&call("pair", json!({"a": "one", "b": 2})))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecuteError::InvalidArgument(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lenient_by_default() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = CommandExecutor::new(pair_registry(), recording_handlers(seen.clone()));

        executor
            .execute(&call("pair", json!({"a": "one", "b": 2})))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![vec![json!("one"), json!(2)]]);
    }
}
