//! Safety controls: discovery-time tool blocklists and the call-time
//! command gate. The two are independent.

pub mod blocklist;
pub mod gate;
pub mod rules;

pub use blocklist::{resolve_blocked_tools, BLOCKED_NOTICE};
pub use gate::{BlockDecision, SafetyDecision, SafetyGate};
pub use rules::{BlockRule, HazardCategory, SafetyRuleSet};
