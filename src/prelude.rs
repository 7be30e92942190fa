//! Convenience re-exports for common use.

pub use crate::config::{BridgeConfig, DynamicProviderRegistry, ProviderConfig, TransportKind};
pub use crate::error::{BridgeError, Result};
pub use crate::host::BridgeHost;
pub use crate::mcp::{BridgeManager, BridgedTool, ConnectionState, ProviderStatus, Readiness};
pub use crate::safety::{SafetyDecision, SafetyGate};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolExecutionContext, ToolResult};
