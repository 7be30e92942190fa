//! MCP schema types and normalization into host parameter schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::types::AgentToolParameters;

/// Schema for a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MCPToolSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl MCPToolSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

impl From<rmcp::model::Tool> for MCPToolSchema {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()),
            input_schema: Some(Value::Object(tool.input_schema.as_ref().clone())),
        }
    }
}

/// Normalize a provider schema into an object parameter schema.
///
/// Missing or non-object schemas yield an empty object schema. Object schemas
/// pass through untouched except that a missing or falsy `type` becomes
/// `"object"`.
pub fn normalize_parameters(schema: Option<&Value>) -> AgentToolParameters {
    let Some(Value::Object(map)) = schema else {
        return AgentToolParameters::empty();
    };

    let mut map = map.clone();
    if map.get("type").map_or(true, is_falsy) {
        map.insert("type".into(), Value::String("object".into()));
    }
    AgentToolParameters::from_schema(Value::Object(map))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn absent_schema_becomes_closed_empty_object() {
        let expected = json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        });
        assert_eq!(normalize_parameters(None).schema, expected);
        assert_eq!(normalize_parameters(Some(&Value::Null)).schema, expected);
        assert_eq!(normalize_parameters(Some(&json!("nope"))).schema, expected);
    }

    #[test]
    fn object_schema_passes_through() {
        let schema = json!({
            "type": "object",
            "properties": { "url": { "type": "string" } },
            "required": ["url"]
        });
        assert_eq!(normalize_parameters(Some(&schema)).schema, schema);
    }

    #[test]
    fn falsy_type_is_replaced_with_object() {
        for missing in [json!({}), json!({ "type": null }), json!({ "type": "" }), json!({ "type": false })] {
            let normalized = normalize_parameters(Some(&missing));
            assert_eq!(normalized.schema["type"], "object");
        }
        let with_props = normalize_parameters(Some(&json!({ "properties": { "a": {} } })));
        assert_eq!(with_props.schema["properties"], json!({ "a": {} }));
    }

    #[test]
    fn schema_record_deserializes_camel_case() {
        let tool: MCPToolSchema = serde_json::from_value(json!({
            "name": "search",
            "inputSchema": { "type": "object" }
        }))
        .unwrap();
        assert_eq!(tool.name, "search");
        assert_eq!(tool.input_schema, Some(json!({ "type": "object" })));
    }
}
