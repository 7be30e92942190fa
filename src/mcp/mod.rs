//! Model Context Protocol (MCP) client and tool bridge.

pub mod client;
pub mod connection;
pub mod manager;
pub mod naming;
pub mod result;
pub mod schema;
pub mod tool;
pub mod transport;

pub use client::{MCPClient, ProviderClient, ProviderConnector, ProviderSession, RmcpConnector};
pub use connection::{ConnectionState, ProviderStatus, Readiness};
pub use manager::{BridgeManager, ManagerOptions, ToolRoute};
pub use naming::build_tool_name;
pub use result::adapt_call_result;
pub use schema::{normalize_parameters, MCPToolSchema};
pub use tool::BridgedTool;
pub use transport::{MCPTransport, StdioTransport, StreamTransport};
