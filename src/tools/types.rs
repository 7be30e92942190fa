//! Tool-related types: parameter schemas and results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema-based parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToolParameters {
    /// JSON Schema object describing the parameters.
    pub schema: Value,
}

impl AgentToolParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Object schema accepting no parameters.
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    /// Add a string property.
    pub fn string(mut self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.insert(name.into(), "string", description.into(), required);
        self
    }

    /// Add a boolean property.
    pub fn boolean(mut self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.insert(name.into(), "boolean", description.into(), required);
        self
    }

    fn insert(&mut self, name: String, kind: &str, description: String, required: bool) {
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": kind,
                "description": description,
            }),
        );
        if required {
            self.required.push(name);
        }
    }

    /// Build into AgentToolParameters.
    pub fn build(self) -> AgentToolParameters {
        AgentToolParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

/// Uniform result returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub details: Value,
}

impl ToolResult {
    pub fn new(content: Vec<ContentBlock>, details: Value) -> Self {
        Self { content, details }
    }

    /// Single text block result.
    pub fn text(text: impl Into<String>, details: Value) -> Self {
        Self::new(vec![ContentBlock::text(text)], details)
    }

    /// Pretty-printed JSON payload as a single text block, echoed in `details`.
    pub fn json(payload: Value) -> Self {
        let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        Self::text(text, payload)
    }

    /// Whether `details` marks this result as a failure of any kind.
    pub fn is_error(&self) -> bool {
        self.details.get("isError").and_then(Value::as_bool) == Some(true)
            || self.details.get("error").is_some()
            || self.is_blocked()
    }

    pub fn is_blocked(&self) -> bool {
        self.details.get("blocked").and_then(Value::as_bool) == Some(true)
    }

    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }
}
