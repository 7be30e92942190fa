//! Per-server connection record and its state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::client::ProviderClient;
use super::tool::BridgedTool;
use crate::config::ProviderConfig;

/// Lifecycle state of one server connection.
///
/// `Idle -> Connecting -> Connected <-> Reconnecting -> Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Coarse availability reported to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Readiness {
    /// A connect or reconnect is in flight.
    Pending,
    Ready,
    Failed,
}

impl ConnectionState {
    pub fn readiness(self) -> Readiness {
        match self {
            Self::Idle | Self::Connecting | Self::Reconnecting => Readiness::Pending,
            Self::Connected => Readiness::Ready,
            Self::Disconnected => Readiness::Failed,
        }
    }
}

/// Snapshot of one server's connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub transport: String,
    pub connected: bool,
    pub tool_count: usize,
    pub reconnect_attempts: u32,
    pub state: ConnectionState,
    pub readiness: Readiness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

/// One configured server as tracked by the manager.
pub struct ProviderConnection {
    pub(crate) config: ProviderConfig,
    pub(crate) client: Option<Arc<dyn ProviderClient>>,
    pub(crate) state: ConnectionState,
    pub(crate) tools: Vec<Arc<BridgedTool>>,
    pub(crate) reconnect_attempts: u32,
    /// Id of the session that currently owns this entry.
    pub(crate) generation: u64,
    pub(crate) last_error: Option<String>,
    pub(crate) connected_at: Option<DateTime<Utc>>,
}

impl ProviderConnection {
    pub(crate) fn new(config: ProviderConfig, generation: u64) -> Self {
        Self {
            config,
            client: None,
            state: ConnectionState::Idle,
            tools: Vec::new(),
            reconnect_attempts: 0,
            generation,
            last_error: None,
            connected_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.client.is_some()
    }

    /// Start an attempt owned by `generation`.
    pub(crate) fn begin_attempt(&mut self, generation: u64, reconnecting: bool) {
        self.generation = generation;
        self.state = if reconnecting {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };
    }

    /// Install a live session. Returns the client it replaced, if any.
    pub(crate) fn mark_connected(
        &mut self,
        client: Arc<dyn ProviderClient>,
        tools: Vec<Arc<BridgedTool>>,
    ) -> Option<Arc<dyn ProviderClient>> {
        self.state = ConnectionState::Connected;
        self.tools = tools;
        self.reconnect_attempts = 0;
        self.last_error = None;
        self.connected_at = Some(Utc::now());
        self.client.replace(client)
    }

    /// Drop the live session. Returns the client to close, if any.
    pub(crate) fn mark_disconnected(
        &mut self,
        error: Option<String>,
    ) -> Option<Arc<dyn ProviderClient>> {
        self.state = ConnectionState::Disconnected;
        if error.is_some() {
            self.last_error = error;
        }
        self.client.take()
    }

    pub fn status(&self) -> ProviderStatus {
        let connected = self.is_connected();
        ProviderStatus {
            name: self.config.name.clone(),
            transport: self.config.transport.to_string(),
            connected,
            tool_count: if connected { self.tools.len() } else { 0 },
            reconnect_attempts: self.reconnect_attempts,
            state: self.state,
            readiness: self.state.readiness(),
            last_error: self.last_error.clone(),
            connected_at: self.connected_at.filter(|_| connected),
        }
    }
}

impl std::fmt::Debug for ProviderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnection")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("tools", &self.tools.len())
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("generation", &self.generation)
            .finish()
    }
}
