//! mcp-bridge: expose Model Context Protocol servers as host tools.
//!
//! Connects to any number of MCP servers over stdio or streamable HTTP,
//! discovers their tools, and wraps each one as a [`tools::Tool`] with a
//! namespaced name. Connections are supervised independently and reconnect
//! with capped exponential backoff.
//!
//! # Quick Start
//!
//! ```no_run
//! use mcp_bridge::prelude::*;
//!
//! # async fn example() -> mcp_bridge::error::Result<()> {
//! let manager = BridgeManager::new();
//! manager
//!     .connect(&[ProviderConfig::stdio("files", "mcp-files", vec![])])
//!     .await?;
//! for tool in manager.get_all_tools() {
//!     println!("{}", tool.name());
//! }
//! manager.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod mcp;
pub mod prelude;
pub mod safety;
pub mod tools;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
