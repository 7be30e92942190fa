//! Declarative, versioned safety rule data.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of hazard a block rule guards against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HazardCategory {
    /// Terminates a resource the bridge depends on (e.g. the debug browser).
    KillsManagedResource,
    /// Starts a second instance that would replace the managed one.
    LaunchesDuplicateInstance,
}

/// One block rule: a regex over lower-cased command text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub category: HazardCategory,
    pub pattern: String,
    /// Human-readable consequence, appended after the quoted command.
    pub reason: String,
    /// What the caller should run instead.
    pub alternative: String,
}

impl BlockRule {
    pub fn new(
        category: HazardCategory,
        pattern: impl Into<String>,
        reason: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        Self {
            category,
            pattern: pattern.into(),
            reason: reason.into(),
            alternative: alternative.into(),
        }
    }
}

/// Ordered allow and block patterns applied to guarded host operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRuleSet {
    pub version: u32,
    /// Host operations whose command text is inspected.
    pub guarded_tools: Vec<String>,
    /// Patterns that short-circuit to allow.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Checked in order; the first match blocks.
    #[serde(default)]
    pub block: Vec<BlockRule>,
}

pub const BROWSER_RULES_VERSION: u32 = 1;

const SAFE_LAUNCHER: &str = r"exec powershell .\scripts\ensure-chrome-debug.ps1";
const KILL_REASON: &str = "would kill Chrome and destroy all open tabs. NEVER kill Chrome.";
const LAUNCH_REASON: &str =
    "launches Chrome directly, which may replace the running session and destroy all open tabs.";

impl SafetyRuleSet {
    /// Built-in rules protecting a debug browser session driven by an MCP server.
    pub fn browser_default() -> Self {
        let kill = |pattern: &str| {
            BlockRule::new(
                HazardCategory::KillsManagedResource,
                pattern,
                KILL_REASON,
                SAFE_LAUNCHER,
            )
        };
        let launch = |pattern: &str| {
            BlockRule::new(
                HazardCategory::LaunchesDuplicateInstance,
                pattern,
                LAUNCH_REASON,
                SAFE_LAUNCHER,
            )
        };

        Self {
            version: BROWSER_RULES_VERSION,
            guarded_tools: vec!["exec".into(), "process".into()],
            allow: vec![r"ensure-chrome-debug\.ps1".into()],
            block: vec![
                kill(r"taskkill\b.*\bchrome"),
                kill(r"stop-process\b.*\bchrome"),
                kill(r"kill\b.*\bchrome"),
                kill(r"pkill\b.*\bchrome"),
                kill(r"killall\b.*\bchrome"),
                launch(r"start-process\b.*\bchrome"),
                launch(r"start\s+chrome"),
                launch(r"chrome\.exe\b.*--remote-debugging"),
            ],
        }
    }
}
