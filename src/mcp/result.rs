//! Conversion of MCP call results into uniform tool results.

use serde_json::{json, Value};

use crate::tools::types::{ContentBlock, ToolResult};

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Adapt a raw `tools/call` result into a [`ToolResult`].
///
/// Never fails: anything that does not look like MCP content is rendered as
/// its JSON text. `details` always carries the raw result and its error flag.
pub fn adapt_call_result(raw: Value) -> ToolResult {
    let is_error = raw.get("isError").and_then(Value::as_bool) == Some(true);

    let mut content = match raw.get("content").and_then(Value::as_array) {
        Some(items) => items.iter().map(adapt_content_item).collect(),
        None => Vec::new(),
    };
    if content.is_empty() {
        content.push(ContentBlock::text(fallback_text(&raw)));
    }

    ToolResult::new(content, json!({ "mcpResult": raw, "isError": is_error }))
}

fn adapt_content_item(item: &Value) -> ContentBlock {
    let kind = item.get("type").and_then(Value::as_str);
    match kind {
        Some("text") => {
            if let Some(text) = item.get("text").and_then(Value::as_str) {
                return ContentBlock::text(text);
            }
        }
        Some("image") => {
            if let Some(data) = item.get("data").and_then(Value::as_str) {
                let mime_type = item
                    .get("mimeType")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                return ContentBlock::Image {
                    data: data.to_string(),
                    mime_type: mime_type.to_string(),
                };
            }
        }
        Some("resource") => {
            let text = item
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| item.pointer("/resource/text").and_then(Value::as_str));
            if let Some(text) = text {
                return ContentBlock::text(text);
            }
        }
        _ => {}
    }
    ContentBlock::text(item.to_string())
}

fn fallback_text(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl ToolResult {
    /// A provider or bridge failure while executing `tool`.
    pub fn execution_error(tool: &str, message: &str) -> Self {
        let payload = json!({ "status": "error", "tool": tool, "error": message });
        Self::text(payload_text(&payload), json!({ "error": message, "isError": true }))
    }

    /// The operation is on the server's blocklist and was never forwarded.
    pub fn blocked(tool: &str, operation: &str, hint: Option<&str>) -> Self {
        let mut message = format!("Tool \"{operation}\" is blocked for safety.");
        if let Some(hint) = hint {
            message.push(' ');
            message.push_str(hint);
        }
        let payload = json!({
            "status": "error",
            "tool": tool,
            "error": message,
            "blocked": true,
        });
        Self::text(
            payload_text(&payload),
            json!({ "error": "tool_blocked", "blocked": true }),
        )
    }

    /// The call was rejected by the safety gate.
    pub fn policy_blocked(tool: &str, reason: &str, alternative: &str) -> Self {
        let payload = json!({
            "status": "error",
            "tool": tool,
            "error": reason,
            "alternative": alternative,
            "blocked": true,
        });
        Self::text(
            payload_text(&payload),
            json!({ "error": "tool_blocked", "blocked": true, "reason": reason }),
        )
    }

    /// The owning server is not connected.
    pub fn disconnected(server: &str) -> Self {
        let payload = json!({
            "status": "error",
            "error": format!("MCP server \"{server}\" is not connected"),
        });
        Self::text(
            payload_text(&payload),
            json!({ "error": "server_disconnected" }),
        )
    }

    /// The caller cancelled the call before a result arrived.
    pub fn cancelled(tool: &str) -> Self {
        let payload = json!({
            "status": "error",
            "tool": tool,
            "error": "Tool call was cancelled",
        });
        Self::text(payload_text(&payload), json!({ "error": "cancelled" }))
    }
}

fn payload_text(payload: &Value) -> String {
    payload.to_string()
}
