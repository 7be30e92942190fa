//! Call-time command firewall for guarded host operations.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::{HazardCategory, SafetyRuleSet};
use crate::error::BridgeError;

const REASON_QUOTE_CHARS: usize = 80;
const LOG_QUOTE_CHARS: usize = 120;

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDecision {
    pub blocked: bool,
    pub category: HazardCategory,
    pub reason: String,
    pub alternative: String,
}

/// Outcome of evaluating one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyDecision {
    Allow,
    Block(BlockDecision),
}

impl SafetyDecision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    pub fn into_block(self) -> Option<BlockDecision> {
        match self {
            Self::Allow => None,
            Self::Block(decision) => Some(decision),
        }
    }
}

struct CompiledBlockRule {
    category: HazardCategory,
    pattern: Regex,
    reason: String,
    alternative: String,
}

/// Compiled [`SafetyRuleSet`].
pub struct SafetyGate {
    version: u32,
    guarded_tools: HashSet<String>,
    allow: Vec<Regex>,
    block: Vec<CompiledBlockRule>,
}

impl std::fmt::Debug for SafetyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyGate")
            .field("version", &self.version)
            .field("guarded_tools", &self.guarded_tools)
            .field("allow", &self.allow.len())
            .field("block", &self.block.len())
            .finish()
    }
}

impl SafetyGate {
    /// Compile a rule set, rejecting invalid patterns.
    pub fn new(rules: &SafetyRuleSet) -> Result<Self, BridgeError> {
        let allow = rules
            .allow
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let block = rules
            .block
            .iter()
            .map(|rule| {
                Ok(CompiledBlockRule {
                    category: rule.category,
                    pattern: Regex::new(&rule.pattern)?,
                    reason: rule.reason.clone(),
                    alternative: rule.alternative.clone(),
                })
            })
            .collect::<Result<Vec<_>, BridgeError>>()?;

        Ok(Self {
            version: rules.version,
            guarded_tools: rules.guarded_tools.iter().cloned().collect(),
            allow,
            block,
        })
    }

    /// Gate built from the built-in browser rules.
    pub fn browser_default() -> Self {
        Self::new(&SafetyRuleSet::browser_default())
            .expect("built-in browser safety patterns are valid")
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn guards(&self, operation: &str) -> bool {
        self.guarded_tools.contains(operation)
    }

    /// Classify a command. Matching is done on lower-cased text; the allow
    /// list wins over every block rule.
    pub fn evaluate(&self, command: &str) -> SafetyDecision {
        let command = command.to_lowercase();
        if self.allow.iter().any(|pattern| pattern.is_match(&command)) {
            return SafetyDecision::Allow;
        }

        let Some(rule) = self.block.iter().find(|rule| rule.pattern.is_match(&command)) else {
            return SafetyDecision::Allow;
        };

        tracing::warn!(
            category = %rule.category,
            command = %truncate_chars(&command, LOG_QUOTE_CHARS),
            "Blocked hazardous command"
        );
        SafetyDecision::Block(BlockDecision {
            blocked: true,
            category: rule.category,
            reason: format!(
                "Command BLOCKED: \"{}\" {} Use this instead: {}",
                truncate_chars(&command, REASON_QUOTE_CHARS),
                rule.reason,
                rule.alternative
            ),
            alternative: rule.alternative.clone(),
        })
    }

    /// Host interception hook run before a tool call.
    ///
    /// Only guarded operations are inspected; the command is read from
    /// `params.command`, falling back to `params.cmd`.
    pub fn before_tool_call(&self, operation: &str, params: &Value) -> Option<BlockDecision> {
        if !self.guards(operation) {
            return None;
        }
        let command = extract_command(params);
        self.evaluate(&command).into_block()
    }

    /// Same as [`before_tool_call`](Self::before_tool_call) for raw argument text.
    pub fn check_raw(&self, operation: &str, raw_args: &str) -> Option<BlockDecision> {
        if !self.guards(operation) {
            return None;
        }
        match serde_json::from_str::<Value>(raw_args) {
            Ok(params) => self.before_tool_call(operation, &params),
            Err(e) => {
                tracing::debug!(operation, error = %e, "Guarded call with unparseable arguments");
                None
            }
        }
    }
}

fn extract_command(params: &Value) -> String {
    let raw = params
        .get("command")
        .filter(|v| !v.is_null())
        .or_else(|| params.get("cmd").filter(|v| !v.is_null()));
    match raw {
        Some(Value::String(command)) => command.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
