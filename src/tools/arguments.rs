//! Typed access to tool call arguments.

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Parse raw argument text; blank text is an empty argument set.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(Value::Object(Map::new())));
        }
        serde_json::from_str(trimmed)
            .map(Self::new)
            .map_err(|e| BridgeError::InvalidArgument(format!("Failed to parse arguments: {e}")))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, BridgeError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| BridgeError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Arguments as a JSON object for forwarding to a provider.
    ///
    /// `null` becomes an empty object and a string is parsed as JSON text.
    pub fn to_object(&self) -> Result<Map<String, Value>, BridgeError> {
        let value = match &self.value {
            Value::Null => return Ok(Map::new()),
            Value::String(raw) => Self::parse(raw)?.value,
            other => other.clone(),
        };
        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(BridgeError::InvalidArgument(format!(
                "Tool arguments must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, BridgeError> {
        let value = Value::Object(self.to_object()?);
        serde_json::from_value(value).map_err(|e| {
            BridgeError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
