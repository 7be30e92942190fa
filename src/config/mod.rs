//! Bridge configuration: provider records and the config file.
//!
//! Resolution order for the config file path:
//! 1. Explicit path passed by the caller
//! 2. `MCP_BRIDGE_CONFIG` (a `.env` file is honoured)
//! 3. `~/.mcp-bridge/bridge.toml`

pub mod dynamic;
pub mod merge;

pub use dynamic::DynamicProviderRegistry;
pub use merge::{config_fingerprint, merge_provider_configs};

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::error::BridgeError;
use crate::safety::rules::SafetyRuleSet;

/// Default handshake timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default reconnect budget.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;
/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "MCP_BRIDGE_CONFIG";

/// Wire transport used to reach a server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportKind {
    /// Spawned subprocess speaking MCP over stdin/stdout.
    Stdio,
    /// Streamed HTTP connection (MCP streamable HTTP).
    #[strum(serialize = "stream", serialize = "sse", serialize = "http")]
    Stream,
    /// Anything else; rejected when the server is connected.
    #[strum(default)]
    Unsupported(String),
}

impl TransportKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stdio => "stdio",
            Self::Stream => "stream",
            Self::Unsupported(kind) => kind,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TransportKind {
    fn from(value: String) -> Self {
        value
            .parse()
            .unwrap_or_else(|_| TransportKind::Unsupported(value))
    }
}

impl From<TransportKind> for String {
    fn from(kind: TransportKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Configuration for a single MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Unique server name, also used for tool namespacing.
    #[builder(into)]
    pub name: String,
    pub transport: TransportKind,
    /// stdio: command to execute.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// stdio: command arguments.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// stdio: environment overrides layered on the inherited environment.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// stream: server URL.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// stream: extra HTTP headers sent with every request.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_reconnect: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
    /// Operations listed but never forwarded. `None` falls back to the
    /// built-in defaults for the server name; `Some(vec![])` blocks nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_tools: Option<Vec<String>>,
}

impl ProviderConfig {
    /// Create a stdio server config.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self::builder()
            .name(name)
            .transport(TransportKind::Stdio)
            .command(command)
            .args(args)
            .build()
    }

    /// Create a streamed HTTP server config.
    pub fn stream(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::builder()
            .name(name)
            .transport(TransportKind::Stream)
            .url(url)
            .build()
    }

    /// Handshake and discovery deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect.unwrap_or(true)
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
            .unwrap_or(DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }

    /// Resolved set of blocked operation names.
    pub fn blocked_tools(&self) -> HashSet<String> {
        crate::safety::blocklist::resolve_blocked_tools(self)
    }

    /// Check that the fields required by the transport are present.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.name.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "Server config missing 'name'".into(),
            ));
        }
        match &self.transport {
            TransportKind::Stdio => {
                if self.command.as_deref().map_or(true, |c| c.trim().is_empty()) {
                    return Err(BridgeError::Configuration(format!(
                        "Server \"{}\": stdio transport requires \"command\"",
                        self.name
                    )));
                }
            }
            TransportKind::Stream => {
                if self.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    return Err(BridgeError::Configuration(format!(
                        "Server \"{}\": stream transport requires \"url\"",
                        self.name
                    )));
                }
            }
            TransportKind::Unsupported(kind) => {
                return Err(BridgeError::Configuration(format!(
                    "Server \"{}\": unsupported transport \"{kind}\"",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Safety gate settings from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySettings {
    /// Force the gate on or off. Unset installs it only when a server with
    /// built-in rules (e.g. `chrome-devtools`) is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replacement rule set; the built-in browser rules when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<SafetyRuleSet>,
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub servers: Vec<ProviderConfig>,
    #[serde(default)]
    pub safety: SafetySettings,
}

impl BridgeConfig {
    pub fn new(servers: Vec<ProviderConfig>) -> Self {
        Self {
            servers,
            safety: SafetySettings::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a config file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_toml_str(&raw)?
        };
        tracing::debug!(path = %path.display(), servers = config.servers.len(), "Loaded bridge config");
        Ok(config)
    }

    /// Resolve the config path from the explicit argument, env, or home dir.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        let _ = dotenvy::dotenv();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        default_config_path()
    }

    /// Load from the resolved path; a missing default file yields an empty config.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, BridgeError> {
        let path = Self::resolve_path(explicit);
        if explicit.is_none() && !path.exists() {
            tracing::debug!(path = %path.display(), "No bridge config found");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Validate every server entry, returning one error per broken entry.
    pub fn validate(&self) -> Vec<BridgeError> {
        self.servers
            .iter()
            .filter_map(|server| server.validate().err())
            .collect()
    }
}

fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".mcp-bridge"))
        .unwrap_or_else(|| PathBuf::from(".mcp-bridge"))
        .join("bridge.toml")
}
