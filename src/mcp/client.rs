//! MCP client sessions and the connector seam used by the manager.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, ClientInfo, JsonObject, ProtocolVersion},
    service::{ClientInitializeError, Peer, RoleClient, RunningServiceCancellationToken, ServiceError},
};
use tokio::sync::oneshot;

use super::schema::MCPToolSchema;
use super::transport::{transport_for, MCPRunningService, MCPTransport};
use crate::config::ProviderConfig;
use crate::error::BridgeError;

/// Name reported to servers during the initialize handshake.
pub const CLIENT_NAME: &str = "mcp-bridge";

/// Operations the manager needs from a live server session.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Enumerate the server's tools.
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>, BridgeError>;

    /// Invoke one tool and return the raw `tools/call` result as JSON.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<serde_json::Value, BridgeError>;

    /// Close the session. Idempotent.
    async fn close(&self) -> Result<(), BridgeError>;
}

/// A freshly initialized session plus a signal that fires when it ends.
pub struct ProviderSession {
    pub client: Arc<dyn ProviderClient>,
    /// Resolves with a short reason once the session has terminated.
    pub closed: oneshot::Receiver<String>,
}

/// Opens sessions for server configs.
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    /// Spawn/attach the transport and complete the initialize handshake.
    async fn connect(&self, config: &ProviderConfig) -> Result<ProviderSession, BridgeError>;
}

/// Connector backed by rmcp transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmcpConnector;

#[async_trait]
impl ProviderConnector for RmcpConnector {
    async fn connect(&self, config: &ProviderConfig) -> Result<ProviderSession, BridgeError> {
        let mut transport = transport_for(config)?;
        let session = connect_with_protocol_fallback(transport.as_mut())
            .await
            .map_err(|error| map_client_initialize_error(&config.name, error))?;

        let (client, closed) = MCPClient::from_running_service(&config.name, session);
        Ok(ProviderSession {
            client: Arc::new(client),
            closed,
        })
    }
}

/// Client for a Model Context Protocol server.
pub struct MCPClient {
    server: String,
    peer: Peer<RoleClient>,
    cancel: Mutex<Option<RunningServiceCancellationToken>>,
}

impl MCPClient {
    /// Wrap an initialized rmcp service.
    ///
    /// The service is moved into a watcher task; the returned receiver fires
    /// when the session ends for any reason.
    pub fn from_running_service(
        server: &str,
        session: MCPRunningService,
    ) -> (Self, oneshot::Receiver<String>) {
        let peer = session.peer().clone();
        let cancel = session.cancellation_token();
        let (closed_tx, closed_rx) = oneshot::channel();

        let watched = server.to_string();
        tokio::spawn(async move {
            let reason = match session.waiting().await {
                Ok(reason) => format!("{reason:?}"),
                Err(e) => format!("session task failed: {e}"),
            };
            tracing::debug!(server = %watched, reason = %reason, "MCP session ended");
            let _ = closed_tx.send(reason);
        });

        let client = Self {
            server: server.to_string(),
            peer,
            cancel: Mutex::new(Some(cancel)),
        };
        (client, closed_rx)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    async fn list_tools_raw(&self) -> Result<Vec<rmcp::model::Tool>, ServiceError> {
        match self.peer.list_all_tools().await {
            Ok(tools) => Ok(tools),
            Err(ServiceError::UnexpectedResponse) => {
                self.peer.list_tools(None).await.map(|page| page.tools)
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl ProviderClient for MCPClient {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>, BridgeError> {
        let tools = self
            .list_tools_raw()
            .await
            .map_err(|error| map_service_error(&self.server, "list_tools", error))?;
        Ok(tools.into_iter().map(MCPToolSchema::from).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<serde_json::Value, BridgeError> {
        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|error| map_service_error(&self.server, "call_tool", error))?;
        Ok(serde_json::to_value(result)?)
    }

    async fn close(&self) -> Result<(), BridgeError> {
        let token = match self.cancel.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = token {
            token.cancel();
        }
        Ok(())
    }
}

fn client_info(protocol_version: ProtocolVersion) -> ClientInfo {
    let mut info = ClientInfo {
        protocol_version,
        ..Default::default()
    };
    info.client_info.name = CLIENT_NAME.to_string();
    info.client_info.version = env!("CARGO_PKG_VERSION").to_string();
    info
}

/// Handshake with the latest protocol, retrying once with 2024-11-05 when
/// the server rejects the version.
pub(crate) async fn connect_with_protocol_fallback(
    transport: &mut dyn MCPTransport,
) -> Result<MCPRunningService, ClientInitializeError> {
    match transport.connect(client_info(ProtocolVersion::LATEST)).await {
        Ok(session) => return Ok(session),
        Err(error) if should_retry_protocol_fallback(&error) => {
            tracing::debug!(transport = transport.kind(), "Retrying MCP handshake with legacy protocol");
        }
        Err(error) => return Err(error),
    }
    transport
        .connect(client_info(ProtocolVersion::V_2024_11_05))
        .await
}

fn should_retry_protocol_fallback(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(error) => {
            let message = error.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

fn map_client_initialize_error(server: &str, error: ClientInitializeError) -> BridgeError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            BridgeError::connect(server, format!("connection closed during initialize: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => {
            BridgeError::connect(server, format!("transport error ({context}): {error}"))
        }
        ClientInitializeError::JsonRpcError(error) => BridgeError::Provider {
            provider: server.to_string(),
            message: format!(
                "initialize JSON-RPC error {}: {}",
                error.code.0, error.message
            ),
        },
        ClientInitializeError::Cancelled => {
            BridgeError::Cancelled(format!("{server}: initialize cancelled"))
        }
        other => BridgeError::connect(server, format!("initialize error: {other}")),
    }
}

fn map_service_error(server: &str, context: &str, error: ServiceError) -> BridgeError {
    match error {
        ServiceError::McpError(error) => BridgeError::Provider {
            provider: server.to_string(),
            message: format!("{context}: MCP error {}: {}", error.code.0, error.message),
        },
        ServiceError::TransportSend(error) => {
            BridgeError::Transport(format!("{server}: {context}: send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            BridgeError::Transport(format!("{server}: {context}: transport closed"))
        }
        ServiceError::UnexpectedResponse => BridgeError::Provider {
            provider: server.to_string(),
            message: format!("{context}: unexpected MCP response"),
        },
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            BridgeError::Cancelled(format!("{server}: {context} cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => BridgeError::Timeout(timeout.as_millis() as u64),
        other => BridgeError::Provider {
            provider: server.to_string(),
            message: format!("{context}: MCP service error: {other}"),
        },
    }
}
