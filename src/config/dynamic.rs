//! Providers registered at runtime by an IDE session.
//!
//! Session definitions arrive as loosely typed JSON: stdio entries carry a
//! `command` and no `type`, remote entries carry `type = "sse" | "http"` and a
//! `url`. Both `env` and `headers` are lists of `{ name, value }` pairs.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::{ProviderConfig, TransportKind};

/// Shared registry of session-provided servers.
///
/// Cloning yields another handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct DynamicProviderRegistry {
    servers: Arc<RwLock<Vec<ProviderConfig>>>,
}

impl DynamicProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registered set with the convertible entries of `servers`.
    ///
    /// An empty input leaves the current set untouched. Returns the number of
    /// entries registered.
    pub fn apply_session_servers(&self, servers: &[Value]) -> usize {
        if servers.is_empty() {
            return 0;
        }

        let converted: Vec<ProviderConfig> = servers
            .iter()
            .filter_map(|server| {
                let config = convert_session_server(server);
                match &config {
                    Some(config) => tracing::info!(
                        server = %config.name,
                        transport = %config.transport,
                        "Registered session MCP server"
                    ),
                    None => tracing::warn!(entry = %server, "Skipped unsupported session MCP server"),
                }
                config
            })
            .collect();

        let count = converted.len();
        match self.servers.write() {
            Ok(mut guard) => *guard = converted,
            Err(poisoned) => *poisoned.into_inner() = converted,
        }
        tracing::debug!(count, "Session MCP servers registered");
        count
    }

    /// Snapshot of the registered configs.
    pub fn configs(&self) -> Vec<ProviderConfig> {
        match self.servers.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        match self.servers.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

/// Convert one session server definition; `None` when unsupported.
pub fn convert_session_server(server: &Value) -> Option<ProviderConfig> {
    let object = server.as_object()?;
    let explicit_name = object
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty());

    if let Some(command) = object.get("command").and_then(Value::as_str) {
        if !command.is_empty() {
            let name = explicit_name
                .map(str::to_string)
                .unwrap_or_else(|| fallback_name("stdio"));
            let args = object
                .get("args")
                .and_then(Value::as_array)
                .map(|args| args.iter().map(value_to_string).collect())
                .unwrap_or_default();
            return Some(
                ProviderConfig::builder()
                    .name(sanitize_name(&name))
                    .transport(TransportKind::Stdio)
                    .command(command)
                    .args(args)
                    .env(name_value_pairs(object.get("env")))
                    .build(),
            );
        }
    }

    let kind = object.get("type").and_then(Value::as_str)?;
    if kind != "sse" && kind != "http" {
        return None;
    }
    let url = object
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())?;
    let name = explicit_name
        .map(str::to_string)
        .unwrap_or_else(|| fallback_name(kind));
    Some(
        ProviderConfig::builder()
            .name(sanitize_name(&name))
            .transport(TransportKind::Stream)
            .url(url)
            .headers(name_value_pairs(object.get("headers")))
            .build(),
    )
}

/// Replace characters outside `[A-Za-z0-9_-]` and collapse underscore runs.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ch = if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            ch
        } else {
            '_'
        };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out
}

fn fallback_name(kind: &str) -> String {
    format!("ide-{kind}-{}", chrono::Utc::now().timestamp_millis())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn name_value_pairs(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(Value::as_str)?;
            let value = entry.get("value").filter(|v| !v.is_null())?;
            (!name.is_empty()).then(|| (name.to_string(), value_to_string(value)))
        })
        .collect()
}
