//! Free-text intent parsing.
//!
//! One completion request per command. The model is shown every registry
//! entry and asked for a bare JSON object; the reply is decoded strictly and
//! checked against the registry before anything runs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{ExecuteError, LlmError};
use crate::executor::CommandExecutor;
use crate::handler::HandlerOutput;
use crate::llm::LanguageModel;
use crate::registry::FunctionRegistry;

/// Structured decode of a free-text command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCall {
    /// Matched function, `None` when nothing matched.
    pub function_name: Option<String>,

    /// Argument values keyed by parameter name.
    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
}

impl ParsedCall {
    pub fn new(
        function_name: impl Into<String>,
        parameters: Map<String, Value>,
        confidence: f64,
    ) -> Self {
        Self {
            function_name: Some(function_name.into()),
            parameters,
            confidence,
        }
    }

    /// The "nothing matched" call.
    pub fn no_match() -> Self {
        Self {
            function_name: None,
            parameters: Map::new(),
            confidence: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.function_name.is_some()
    }
}

/// Why a model reply was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("reply is not JSON: {0}")]
    NotJson(String),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("field {field} has the wrong shape: {found}")]
    InvalidField { field: &'static str, found: String },

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("invalid function name: {0}")]
    UnknownFunction(String),
}

/// Why [`IntentParser::parse`] produced no call.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Decode a model reply into a call that names a registered function.
///
/// The reply must be exactly one JSON object (surrounding whitespace is
/// allowed). `functionName` may be `null` or absent to signal no match;
/// `parameters` defaults to `{}` and `confidence` to `0`.
pub fn decode_call(reply: &str, registry: &FunctionRegistry) -> Result<ParsedCall, DecodeError> {
    let value: Value =
        serde_json::from_str(reply.trim()).map_err(|e| DecodeError::NotJson(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let function_name = match object.remove("functionName") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) if name.is_empty() => None,
        Some(Value::String(name)) => Some(name),
        Some(other) => {
            return Err(DecodeError::InvalidField {
                field: "functionName",
                found: other.to_string(),
            });
        }
    };

    let parameters = match object.remove("parameters") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(parameters)) => parameters,
        Some(other) => {
            return Err(DecodeError::InvalidField {
                field: "parameters",
                found: other.to_string(),
            });
        }
    };

    let confidence = match object.remove("confidence") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(other) => {
            return Err(DecodeError::InvalidField {
                field: "confidence",
                found: other.to_string(),
            });
        }
    };
    if !(0.0..=1.0).contains(&confidence) {
        return Err(DecodeError::ConfidenceOutOfRange(confidence));
    }

    if let Some(name) = &function_name {
        if !registry.contains(name) {
            return Err(DecodeError::UnknownFunction(name.clone()));
        }
    }

    Ok(ParsedCall {
        function_name,
        parameters,
        confidence,
    })
}

/// Build the system prompt listing every registry entry.
pub fn system_prompt(registry: &FunctionRegistry) -> String {
    let mut functions = String::new();
    for entry in registry.entries() {
        let parameters = entry
            .parameters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        functions.push_str(&format!(
            "\n  {}: {}\n  Parameters: {}\n  Examples: {}\n",
            entry.name,
            entry.description,
            if parameters.is_empty() { "none" } else { &parameters },
            entry.examples.join(", ")
        ));
    }

    format!(
        r#"You are a function parser that matches user commands to available functions.
Available functions:
{functions}
Your job is to:
1. Identify which function best matches the user's intent
2. Extract any required parameters
3. Return ONLY a JSON object in this format:
{{
  "functionName": "nameOfFunction",
  "parameters": {{
    "paramName": "value"
  }},
  "confidence": 0.8
}}
where confidence is how sure you are of the match, between 0 and 1.

If no function matches well, return:
{{ "functionName": null, "parameters": {{}}, "confidence": 0 }}

DO NOT ADD ANY COMMENTS OR TEXT OUTSIDE THE JSON OBJECT."#
    )
}

/// Build the user prompt for one command.
pub fn user_prompt(user_input: &str) -> String {
    format!("Parse this command: \"{user_input}\"")
}

/// Resolves free text to a registered function and runs it.
pub struct IntentParser {
    model: Arc<dyn LanguageModel>,
    executor: Arc<CommandExecutor>,
    system_prompt: String,
}

impl IntentParser {
    pub fn new(model: Arc<dyn LanguageModel>, executor: Arc<CommandExecutor>) -> Self {
        let system_prompt = system_prompt(executor.registry());
        Self {
            model,
            executor,
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Ask the model for a call without executing it.
    pub async fn parse(&self, user_input: &str) -> Result<ParsedCall, ParseError> {
        let reply = self
            .model
            .complete(&self.system_prompt, &user_prompt(user_input))
            .await?;
        debug!("Model reply: {reply}");
        Ok(decode_call(&reply, self.executor.registry())?)
    }

    /// Parse `user_input` and execute the matched function.
    ///
    /// Returns `Ok(None)` when the model could not be reached, its reply was
    /// rejected, or nothing matched; those are logged, not raised. Executor
    /// and handler errors are returned.
    pub async fn parse_command(
        &self,
        user_input: &str,
    ) -> Result<Option<HandlerOutput>, ExecuteError> {
        let call = match self.parse(user_input).await {
            Ok(call) => call,
            Err(ParseError::Model(e)) => {
                error!("Error in command parsing: {e}");
                return Ok(None);
            }
            Err(ParseError::Decode(e)) => {
                warn!("Error parsing model response: {e}");
                return Ok(None);
            }
        };

        if !call.is_match() {
            info!("No function matched: {user_input}");
            return Ok(None);
        }

        self.executor.execute(&call).await.map(Some)
    }
}
