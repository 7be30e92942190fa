//! Connection-lifecycle manager for a set of MCP servers.
//!
//! The manager owns one [`ProviderConnection`] per configured server name.
//! Each server connects, discovers and reconnects independently; a failure
//! on one never affects the others.
//!
//! Concurrency rules:
//! - the connection table sits behind a single `std::sync::Mutex` that is
//!   never held across an `.await`;
//! - every session carries a generation number, and monitor or reconnect
//!   results for a stale generation are dropped;
//! - reconnect timers and session monitors stop when the manager's shutdown
//!   token is cancelled by [`BridgeManager::dispose`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use bon::Builder;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::client::{ProviderClient, ProviderConnector, RmcpConnector};
use super::connection::{ConnectionState, ProviderConnection, ProviderStatus};
use super::result::adapt_call_result;
use super::schema::MCPToolSchema;
use super::tool::{BridgedTool, ToolDispatch};
use crate::config::ProviderConfig;
use crate::error::BridgeError;
use crate::safety::gate::SafetyGate;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::types::ToolResult;
use crate::util::backoff::BackoffPolicy;
use crate::util::timeout::with_timeout;

/// Construction options for [`BridgeManager`].
#[derive(Builder, Default)]
pub struct ManagerOptions {
    /// Session factory; rmcp transports when unset.
    pub connector: Option<Arc<dyn ProviderConnector>>,
    #[builder(default)]
    pub backoff: BackoffPolicy,
    /// Call-time command gate consulted before every forwarded call.
    pub safety_gate: Option<Arc<SafetyGate>>,
}

/// Where a namespaced tool name routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRoute {
    pub server: String,
    pub operation: String,
    pub blocked: bool,
}

#[derive(Default)]
struct ConnectionTable {
    entries: HashMap<String, ProviderConnection>,
    /// Insertion order of `entries`.
    order: Vec<String>,
}

impl ConnectionTable {
    fn insert(&mut self, connection: ProviderConnection) {
        let name = connection.name().to_string();
        self.order.push(name.clone());
        self.entries.insert(name, connection);
    }

    fn remove(&mut self, name: &str) -> Option<ProviderConnection> {
        self.order.retain(|existing| existing != name);
        self.entries.remove(name)
    }

    fn ordered(&self) -> impl Iterator<Item = &ProviderConnection> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }
}

struct ManagerInner {
    table: Mutex<ConnectionTable>,
    disposed: AtomicBool,
    connector: Arc<dyn ProviderConnector>,
    backoff: BackoffPolicy,
    shutdown: CancellationToken,
    safety: Option<Arc<SafetyGate>>,
    generations: AtomicU64,
}

/// Manages connections to any number of MCP servers.
///
/// Cheap to clone; all clones share one connection table.
#[derive(Clone)]
pub struct BridgeManager {
    inner: Arc<ManagerInner>,
}

impl Default for BridgeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeManager {
    pub fn new() -> Self {
        Self::with_options(ManagerOptions::default())
    }

    pub fn with_connector(connector: Arc<dyn ProviderConnector>) -> Self {
        Self::with_options(ManagerOptions::builder().connector(connector).build())
    }

    pub fn with_options(options: ManagerOptions) -> Self {
        let connector = options
            .connector
            .unwrap_or_else(|| Arc::new(RmcpConnector));
        Self {
            inner: Arc::new(ManagerInner {
                table: Mutex::new(ConnectionTable::default()),
                disposed: AtomicBool::new(false),
                connector,
                backoff: options.backoff,
                shutdown: CancellationToken::new(),
                safety: options.safety_gate,
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Connect every server concurrently and wait until all attempts settle.
    ///
    /// Per-server failures are logged and reflected in [`get_status`](Self::get_status);
    /// only a disposed manager returns an error.
    pub async fn connect(&self, configs: &[ProviderConfig]) -> Result<(), BridgeError> {
        if self.inner.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        if configs.is_empty() {
            tracing::debug!("No MCP servers configured");
            return Ok(());
        }

        tracing::info!(servers = configs.len(), "Connecting MCP servers");
        let mut attempts = JoinSet::new();
        for config in configs {
            let Some(generation) = self.inner.register(config) else {
                continue;
            };
            let inner = Arc::clone(&self.inner);
            let config = config.clone();
            attempts.spawn(async move {
                // Initial failures stay recorded in status; only runtime loss retries.
                let _ = inner.run_attempt(config, generation, false).await;
            });
        }
        while let Some(joined) = attempts.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "MCP connect task failed");
            }
        }

        let (connected, total) = {
            let table = self.inner.lock_table();
            let connected = table.entries.values().filter(|c| c.is_connected()).count();
            (connected, table.entries.len())
        };
        tracing::info!(connected, total, "MCP connect finished");
        Ok(())
    }

    /// Tools of every connected server, in configuration order.
    pub fn get_all_tools(&self) -> Vec<Arc<BridgedTool>> {
        let table = self.inner.lock_table();
        table
            .ordered()
            .filter(|connection| connection.is_connected())
            .flat_map(|connection| connection.tools.iter().cloned())
            .collect()
    }

    /// Tools of one server; empty when unknown or not connected.
    pub fn get_server_tools(&self, name: &str) -> Vec<Arc<BridgedTool>> {
        let table = self.inner.lock_table();
        table
            .entries
            .get(name)
            .filter(|connection| connection.is_connected())
            .map(|connection| connection.tools.clone())
            .unwrap_or_default()
    }

    /// Reverse lookup of a namespaced tool name among connected servers.
    pub fn resolve_tool(&self, tool_name: &str) -> Option<ToolRoute> {
        self.inner.find_tool(tool_name).map(|tool| ToolRoute {
            server: tool.server().to_string(),
            operation: tool.operation().to_string(),
            blocked: tool.is_blocked(),
        })
    }

    /// Execute a tool by its namespaced name.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        args: Value,
        ctx: &ToolExecutionContext,
    ) -> ToolResult {
        if self.inner.is_disposed() {
            return ToolResult::execution_error(tool_name, &BridgeError::Disposed.to_string());
        }
        match self.inner.find_tool(tool_name) {
            Some(tool) => tool.execute(&ToolArguments::new(args), ctx).await,
            None => ToolResult::execution_error(tool_name, &format!("Unknown MCP tool \"{tool_name}\"")),
        }
    }

    /// Status of every known server, in configuration order.
    pub fn get_status(&self) -> Vec<ProviderStatus> {
        let table = self.inner.lock_table();
        table.ordered().map(ProviderConnection::status).collect()
    }

    /// Reconnect one server now, resetting its reconnect budget.
    pub async fn reconnect(&self, name: &str) -> Result<(), BridgeError> {
        self.inner.reconnect_server(name, None, true).await
    }

    /// Close and forget one server. Returns whether it was known.
    pub async fn disconnect(&self, name: &str) -> bool {
        let removed = self.inner.lock_table().remove(name);
        let Some(mut connection) = removed else {
            return false;
        };
        if let Some(client) = connection.client.take() {
            if let Err(e) = client.close().await {
                tracing::debug!(server = %name, error = %e, "Error closing MCP client");
            }
        }
        tracing::info!(server = %name, "Disconnected MCP server");
        true
    }

    /// Close every connection and reject further use. Idempotent.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();

        let clients: Vec<(String, Arc<dyn ProviderClient>)> = {
            let mut table = self.inner.lock_table();
            table.order.clear();
            table
                .entries
                .drain()
                .filter_map(|(name, mut connection)| {
                    connection.client.take().map(|client| (name, client))
                })
                .collect()
        };

        let count = clients.len();
        futures::future::join_all(clients.into_iter().map(|(name, client)| async move {
            if let Err(e) = client.close().await {
                tracing::debug!(server = %name, error = %e, "Error closing MCP client during dispose");
            }
        }))
        .await;
        tracing::info!(closed = count, "MCP bridge disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    pub fn safety_gate(&self) -> Option<&Arc<SafetyGate>> {
        self.inner.safety.as_ref()
    }
}

impl std::fmt::Debug for BridgeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeManager")
            .field("disposed", &self.inner.is_disposed())
            .field("servers", &self.inner.lock_table().order)
            .finish()
    }
}

impl ManagerInner {
    fn lock_table(&self) -> MutexGuard<'_, ConnectionTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn find_tool(&self, tool_name: &str) -> Option<Arc<BridgedTool>> {
        let table = self.lock_table();
        let found = table
            .ordered()
            .filter(|connection| connection.is_connected())
            .flat_map(|connection| connection.tools.iter())
            .find(|tool| tool.name() == tool_name)
            .cloned();
        found
    }

    /// Add a `Connecting` entry for `config`. `None` when the name is taken.
    fn register(&self, config: &ProviderConfig) -> Option<u64> {
        let mut table = self.lock_table();
        if table.entries.contains_key(&config.name) {
            tracing::warn!(server = %config.name, "MCP server already registered; skipping");
            return None;
        }
        let generation = self.next_generation();
        let mut connection = ProviderConnection::new(config.clone(), generation);
        connection.begin_attempt(generation, false);
        table.insert(connection);
        Some(generation)
    }

    /// Handshake, discover and commit one session for `generation`.
    async fn run_attempt(
        self: &Arc<Self>,
        config: ProviderConfig,
        generation: u64,
        reconnecting: bool,
    ) -> Result<(), BridgeError> {
        let name = config.name.clone();
        match self.establish(&config).await {
            Ok((client, closed, schemas)) => {
                self.commit(&config, generation, client, closed, &schemas).await;
                Ok(())
            }
            Err(e) => {
                let owned = {
                    let mut table = self.lock_table();
                    match table.entries.get_mut(&name) {
                        Some(entry) if entry.generation == generation => {
                            entry.mark_disconnected(Some(e.to_string()));
                            true
                        }
                        _ => false,
                    }
                };
                tracing::error!(server = %name, reconnecting, error = %e, "Failed to connect MCP server");
                if owned && reconnecting && !self.is_disposed() {
                    self.schedule_reconnect(&name);
                }
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        config: &ProviderConfig,
    ) -> Result<(Arc<dyn ProviderClient>, oneshot::Receiver<String>, Vec<MCPToolSchema>), BridgeError>
    {
        config.validate()?;
        let timeout = config.timeout();
        tracing::debug!(server = %config.name, transport = %config.transport, "Connecting MCP server");

        let session = with_timeout(timeout, self.connector.connect(config)).await?;
        let client = session.client;

        match with_timeout(timeout, client.list_tools()).await {
            Ok(schemas) => Ok((client, session.closed, schemas)),
            Err(e) => {
                if let Err(close_err) = client.close().await {
                    tracing::debug!(server = %config.name, error = %close_err, "Error closing MCP client after failed discovery");
                }
                Err(e)
            }
        }
    }

    fn build_tools(self: &Arc<Self>, config: &ProviderConfig, schemas: &[MCPToolSchema]) -> Vec<Arc<BridgedTool>> {
        let blocked = config.blocked_tools();
        let weak: Weak<ManagerInner> = Arc::downgrade(self);
        let dispatch: Weak<dyn ToolDispatch> = weak;

        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(schemas.len());
        for schema in schemas {
            let is_blocked = blocked.contains(&schema.name);
            let tool = BridgedTool::new(&config.name, schema, is_blocked, dispatch.clone());
            if !seen.insert(tool.name().to_string()) {
                tracing::warn!(
                    server = %config.name,
                    tool = %tool.name(),
                    operation = %schema.name,
                    "Tool name collides after sanitization; keeping the first"
                );
                continue;
            }
            if is_blocked {
                tracing::info!(server = %config.name, tool = %tool.name(), "Registered blocked MCP tool");
            }
            tools.push(Arc::new(tool));
        }
        tools
    }

    async fn commit(
        self: &Arc<Self>,
        config: &ProviderConfig,
        generation: u64,
        client: Arc<dyn ProviderClient>,
        closed: oneshot::Receiver<String>,
        schemas: &[MCPToolSchema],
    ) {
        let name = config.name.clone();
        let tools = self.build_tools(config, schemas);
        let tool_count = tools.len();

        let outcome = {
            let mut table = self.lock_table();
            let taken: HashSet<String> = table
                .ordered()
                .filter(|other| other.name() != name && other.is_connected())
                .flat_map(|other| other.tools.iter().map(|t| t.name().to_string()))
                .collect();

            match table.entries.get_mut(&name) {
                Some(entry) if entry.generation == generation && !self.is_disposed() => {
                    for tool in tools.iter().filter(|t| taken.contains(t.name())) {
                        tracing::warn!(server = %name, tool = %tool.name(), "Tool name collides with another server");
                    }
                    Ok(entry.mark_connected(Arc::clone(&client), tools))
                }
                _ => Err(()),
            }
        };

        match outcome {
            Ok(replaced) => {
                tracing::info!(server = %name, tools = tool_count, "Connected to MCP server");
                if let Some(replaced) = replaced {
                    let _ = replaced.close().await;
                }
                self.spawn_monitor(name, generation, closed);
            }
            Err(()) => {
                tracing::debug!(server = %name, generation, "Discarding stale MCP session");
                if let Err(e) = client.close().await {
                    tracing::debug!(server = %name, error = %e, "Error closing stale MCP client");
                }
            }
        }
    }

    fn spawn_monitor(self: &Arc<Self>, name: String, generation: u64, closed: oneshot::Receiver<String>) {
        let weak = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let reason = tokio::select! {
                _ = shutdown.cancelled() => return,
                reason = closed => reason.unwrap_or_else(|_| "session dropped".to_string()),
            };
            if let Some(inner) = weak.upgrade() {
                inner.handle_disconnect(&name, generation, &reason).await;
            }
        });
    }

    async fn handle_disconnect(self: &Arc<Self>, name: &str, generation: u64, reason: &str) {
        if self.is_disposed() {
            return;
        }
        let stale = {
            let mut table = self.lock_table();
            match table.entries.get_mut(name) {
                Some(entry) if entry.generation == generation && entry.is_connected() => {
                    entry.mark_disconnected(Some(format!("session closed: {reason}")))
                }
                _ => return,
            }
        };
        tracing::warn!(server = %name, reason = %reason, "MCP server disconnected");
        if let Some(stale) = stale {
            let _ = stale.close().await;
        }
        self.schedule_reconnect(name);
    }

    /// Arm a reconnect timer if the server's budget allows another attempt.
    fn schedule_reconnect(self: &Arc<Self>, name: &str) {
        let (attempt, generation) = {
            let mut table = self.lock_table();
            let Some(entry) = table.entries.get_mut(name) else {
                return;
            };
            let max = entry.config.max_reconnect_attempts();
            if !entry.config.auto_reconnect()
                || !BackoffPolicy::should_retry(entry.reconnect_attempts, max)
            {
                entry.state = ConnectionState::Disconnected;
                tracing::error!(
                    server = %name,
                    attempts = entry.reconnect_attempts,
                    max,
                    "MCP server permanently disconnected"
                );
                return;
            }
            entry.reconnect_attempts += 1;
            entry.state = ConnectionState::Reconnecting;
            (entry.reconnect_attempts, entry.generation)
        };

        let delay = self.backoff.delay_for_attempt(attempt);
        tracing::info!(
            server = %name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling MCP reconnect"
        );

        let weak = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        let _ = inner.reconnect_server(&name, Some(generation), false).await;
                    }
                }
            }
        });
    }

    /// Replace a server's session in place.
    ///
    /// With `expected` set (timer path) the attempt only runs if the entry is
    /// still owned by that generation and not connected.
    async fn reconnect_server(
        self: &Arc<Self>,
        name: &str,
        expected: Option<u64>,
        reset_budget: bool,
    ) -> Result<(), BridgeError> {
        if self.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        let generation = self.next_generation();
        let (config, stale) = {
            let mut table = self.lock_table();
            let Some(entry) = table.entries.get_mut(name) else {
                return match expected {
                    Some(_) => Ok(()),
                    None => Err(BridgeError::InvalidArgument(format!(
                        "Unknown MCP server \"{name}\""
                    ))),
                };
            };
            if let Some(expected) = expected {
                if entry.generation != expected || entry.is_connected() {
                    return Ok(());
                }
            }
            if reset_budget {
                entry.reconnect_attempts = 0;
            }
            entry.begin_attempt(generation, true);
            (entry.config.clone(), entry.client.take())
        };

        tracing::info!(server = %name, generation, "Reconnecting MCP server");
        if let Some(stale) = stale {
            if let Err(e) = stale.close().await {
                tracing::debug!(server = %name, error = %e, "Error closing stale MCP client");
            }
        }
        self.run_attempt(config, generation, true).await
    }
}

#[async_trait]
impl ToolDispatch for ManagerInner {
    async fn dispatch(
        &self,
        tool: &BridgedTool,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> ToolResult {
        let arguments = match args.to_object() {
            Ok(arguments) => arguments,
            Err(e) => return ToolResult::execution_error(tool.name(), &e.to_string()),
        };

        if let Some(gate) = &self.safety {
            let params = Value::Object(arguments.clone());
            let decision = gate
                .before_tool_call(tool.name(), &params)
                .or_else(|| gate.before_tool_call(tool.operation(), &params));
            if let Some(block) = decision {
                return ToolResult::policy_blocked(tool.name(), &block.reason, &block.alternative);
            }
        }

        let client = {
            let table = self.lock_table();
            table
                .entries
                .get(tool.server())
                .filter(|connection| connection.is_connected())
                .and_then(|connection| connection.client.clone())
        };
        let Some(client) = client else {
            return ToolResult::disconnected(tool.server());
        };

        tracing::debug!(tool = %tool.name(), call_id = %ctx.call_id, "Calling MCP tool");
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::info!(tool = %tool.name(), call_id = %ctx.call_id, "MCP tool call cancelled");
                ToolResult::cancelled(tool.name())
            }
            result = client.call_tool(tool.operation(), Some(arguments)) => match result {
                Ok(raw) => adapt_call_result(raw),
                Err(e) => {
                    tracing::error!(tool = %tool.name(), error = %e, "MCP tool execution failed");
                    ToolResult::execution_error(tool.name(), &e.to_string())
                }
            },
        }
    }
}
