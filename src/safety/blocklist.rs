//! Discovery-time per-server tool blocklists.

use std::collections::HashSet;

use crate::config::ProviderConfig;

/// Appended to the description of every blocked tool.
pub const BLOCKED_NOTICE: &str =
    " [BLOCKED: This tool is disabled for safety. Do NOT attempt to call it.]";

/// Built-in blocks applied when a server config has no explicit list.
pub struct DefaultBlock {
    pub server: &'static str,
    pub tools: &'static [&'static str],
    /// Guidance included in the blocked result.
    pub hint: &'static str,
}

pub const DEFAULT_BLOCKED_TOOLS: &[DefaultBlock] = &[DefaultBlock {
    server: "chrome-devtools",
    tools: &["close_page"],
    hint: "You must NOT close browser tabs/pages. Use \"new_page\" to create new tabs instead.",
}];

fn default_for(server: &str) -> Option<&'static DefaultBlock> {
    DEFAULT_BLOCKED_TOOLS
        .iter()
        .find(|entry| entry.server == server)
}

/// Blocked operation names for a server: the explicit list when present
/// (empty blocks nothing), else the built-in default for its name.
pub fn resolve_blocked_tools(config: &ProviderConfig) -> HashSet<String> {
    match &config.blocked_tools {
        Some(explicit) => explicit.iter().cloned().collect(),
        None => default_for(&config.name)
            .map(|entry| entry.tools.iter().map(|t| t.to_string()).collect())
            .unwrap_or_default(),
    }
}

/// Guidance for a blocked call when `operation` is one of the server's
/// built-in blocks.
pub fn blocked_hint(server: &str, operation: &str) -> Option<&'static str> {
    default_for(server)
        .filter(|entry| entry.tools.contains(&operation))
        .map(|entry| entry.hint)
}

/// Whether `server` carries built-in safety defaults.
pub fn has_builtin_defaults(server: &str) -> bool {
    default_for(server).is_some()
}
