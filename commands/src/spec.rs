//! Parameter declarations for registry entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One declared parameter of a registry entry.
///
/// Declaration order matters: handlers receive arguments positionally in
/// the order parameters appear in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name, as the model is told to emit it.
    pub name: String,

    /// Data type.
    #[serde(rename = "type")]
    pub data_type: DataType,

    /// Whether the parameter is required.
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    /// Create a new required parameter.
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: true,
        }
    }

    /// Create a new optional parameter.
    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
        }
    }

    /// Check a bound value against this declaration.
    ///
    /// `Null` stands for "not supplied" and only fails for required
    /// parameters.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            if self.required {
                return Err(format!("missing required parameter: {}", self.name));
            }
            return Ok(());
        }

        let valid_type = match self.data_type {
            DataType::String => value.is_string(),
            DataType::Integer => value.is_i64() || value.is_u64(),
            DataType::Number => value.is_number(),
            DataType::Boolean => value.is_boolean(),
            DataType::Array => value.is_array(),
            DataType::Object => value.is_object(),
        };

        if !valid_type {
            return Err(format!(
                "invalid type for {}: expected {}, got {value}",
                self.name, self.data_type
            ));
        }

        Ok(())
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required {
            write!(f, "{} ({}, required)", self.name, self.data_type)
        } else {
            write!(f, "{} ({})", self.name, self.data_type)
        }
    }
}

/// Data types for parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl DataType {
    /// Convert to JSON Schema type string.
    pub fn to_json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_json_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_signature_display() {
        assert_eq!(
            ParameterSpec::required("query", DataType::String).to_string(),
            "query (string, required)"
        );
        assert_eq!(
            ParameterSpec::optional("enable", DataType::Boolean).to_string(),
            "enable (boolean)"
        );
    }

    #[test]
    fn test_deserialize_registry_shape() {
        let param: ParameterSpec =
            serde_json::from_value(json!({"name": "increase", "type": "boolean"})).unwrap();
        assert_eq!(
            param,
            ParameterSpec::optional("increase", DataType::Boolean)
        );
    }

    #[test]
    fn test_validation() {
        let count = ParameterSpec::required("count", DataType::Integer);
        assert!(count.validate(&json!(50)).is_ok());
        assert!(count.validate(&json!(1.5)).is_err());
        assert!(count.validate(&json!("50")).is_err());
        assert!(count.validate(&Value::Null).is_err());

        let note = ParameterSpec::optional("note", DataType::String);
        assert!(note.validate(&Value::Null).is_ok());
        assert!(note.validate(&json!("hi")).is_ok());
    }
}
