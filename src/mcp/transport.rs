//! MCP transport layer.

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService};

use crate::config::{ProviderConfig, TransportKind};
use crate::error::BridgeError;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Transport trait for MCP communication.
#[async_trait]
pub trait MCPTransport: Send {
    /// Open the wire and run the initialize handshake.
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError>;

    /// Short transport name for logs.
    fn kind(&self) -> &'static str;
}

mod stdio;
mod stream;

pub use stdio::StdioTransport;
pub use stream::StreamTransport;

/// Build the transport described by a validated server config.
pub fn transport_for(config: &ProviderConfig) -> Result<Box<dyn MCPTransport>, BridgeError> {
    config.validate()?;
    match &config.transport {
        TransportKind::Stdio => {
            let command = config.command.clone().unwrap_or_default();
            Ok(Box::new(
                StdioTransport::new(command, config.args.clone()).with_env(config.env.clone()),
            ))
        }
        TransportKind::Stream => {
            let url = config.url.clone().unwrap_or_default();
            let mut transport = StreamTransport::new(url);
            for (name, value) in &config.headers {
                transport = transport.header(name, value);
            }
            Ok(Box::new(transport))
        }
        TransportKind::Unsupported(kind) => Err(BridgeError::Configuration(format!(
            "Server \"{}\": unsupported transport \"{kind}\"",
            config.name
        ))),
    }
}
