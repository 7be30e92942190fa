//! Host-facing façade over a [`BridgeManager`].
//!
//! A host owns one `BridgeHost`. It merges static and session servers,
//! rebuilds the manager when the merged configuration changes, and exposes a
//! placeholder status tool while servers are still connecting.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{
    config_fingerprint, merge_provider_configs, BridgeConfig, DynamicProviderRegistry,
    ProviderConfig,
};
use crate::error::BridgeError;
use crate::mcp::client::ProviderConnector;
use crate::mcp::connection::Readiness;
use crate::mcp::manager::{BridgeManager, ManagerOptions};
use crate::safety::blocklist::has_builtin_defaults;
use crate::safety::gate::{BlockDecision, SafetyGate};
use crate::safety::rules::SafetyRuleSet;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::{AgentToolParameters, ToolResult};
use crate::util::backoff::BackoffPolicy;

/// Name of the placeholder tool offered while no bridged tools exist.
pub const STATUS_TOOL_NAME: &str = "mcp__bridge_status";

type PendingConnect = Shared<BoxFuture<'static, ()>>;

#[derive(Debug, Default, Deserialize)]
struct StatusArgs {
    #[serde(default)]
    reconnect: bool,
}

#[derive(Default)]
struct HostState {
    manager: Option<BridgeManager>,
    fingerprint: String,
    pending: Option<PendingConnect>,
}

/// Explicitly owned bridge instance for one host process.
pub struct BridgeHost {
    static_servers: Vec<ProviderConfig>,
    registry: DynamicProviderRegistry,
    safety: Option<Arc<SafetyGate>>,
    connector: Option<Arc<dyn ProviderConnector>>,
    backoff: BackoffPolicy,
    state: Mutex<HostState>,
}

impl BridgeHost {
    /// Build a host from a config file's contents.
    ///
    /// Invalid server entries are logged and still passed through so their
    /// failure shows up in status. A custom safety rule set with a bad
    /// pattern is an error.
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        tracing::info!(servers = config.servers.len(), "MCP bridge loaded");
        for error in config.validate() {
            tracing::error!(error = %error, "Invalid MCP server config");
        }

        let enabled = config.safety.enabled.unwrap_or_else(|| {
            config
                .servers
                .iter()
                .any(|server| has_builtin_defaults(&server.name))
        });
        let safety = if enabled {
            let rules = config
                .safety
                .rules
                .clone()
                .unwrap_or_else(SafetyRuleSet::browser_default);
            tracing::info!(version = rules.version, "Safety gate installed");
            Some(Arc::new(SafetyGate::new(&rules)?))
        } else {
            None
        };

        Ok(Self {
            static_servers: config.servers,
            registry: DynamicProviderRegistry::new(),
            safety,
            connector: None,
            backoff: BackoffPolicy::default(),
            state: Mutex::new(HostState::default()),
        })
    }

    /// Share a session registry with the component that receives IDE servers.
    pub fn with_registry(mut self, registry: DynamicProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn ProviderConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn registry(&self) -> &DynamicProviderRegistry {
        &self.registry
    }

    pub fn safety_gate(&self) -> Option<&Arc<SafetyGate>> {
        self.safety.as_ref()
    }

    /// Static servers merged with session servers (session wins by name).
    pub fn effective_servers(&self) -> Vec<ProviderConfig> {
        merge_provider_configs(&self.static_servers, &self.registry.configs())
    }

    /// Current manager, if one has been started.
    pub fn manager(&self) -> Option<BridgeManager> {
        self.lock_state().manager.clone()
    }

    /// Tools to offer the host right now.
    ///
    /// Starts (or restarts, when the merged configuration changed) a
    /// background connect. Returns the bridged tools when any are available,
    /// otherwise the placeholder status tool; empty when nothing is
    /// configured. Must be called from within a Tokio runtime.
    pub fn tools(self: &Arc<Self>) -> Vec<Arc<dyn Tool>> {
        let servers = self.effective_servers();
        if servers.is_empty() {
            return Vec::new();
        }
        let fingerprint = config_fingerprint(&servers);

        let manager = {
            let mut state = self.lock_state();
            let current = state
                .manager
                .clone()
                .filter(|_| state.fingerprint == fingerprint);
            match current {
                Some(manager) => manager,
                None => {
                    if let Some(old) = state.manager.take() {
                        tracing::info!("MCP configuration changed; rebuilding bridge");
                        tokio::spawn(async move { old.dispose().await });
                    }
                    let manager = self.new_manager();
                    state.pending = Some(spawn_connect(manager.clone(), servers));
                    state.manager = Some(manager.clone());
                    state.fingerprint = fingerprint;
                    manager
                }
            }
        };

        let tools = manager.get_all_tools();
        if tools.is_empty() {
            return vec![self.status_tool()];
        }
        tools
            .into_iter()
            .map(|tool| tool as Arc<dyn Tool>)
            .collect()
    }

    /// Wait for the most recent background connect to settle.
    pub async fn wait_ready(&self) {
        let pending = self.lock_state().pending.clone();
        if let Some(pending) = pending {
            pending.await;
        }
    }

    /// Per-server readiness for every effective server, in order.
    pub fn readiness(&self) -> Vec<(String, Readiness)> {
        let statuses = self
            .manager()
            .map(|manager| manager.get_status())
            .unwrap_or_default();
        self.effective_servers()
            .into_iter()
            .map(|server| {
                let readiness = statuses
                    .iter()
                    .find(|status| status.name == server.name)
                    .map(|status| status.readiness)
                    .unwrap_or(Readiness::Pending);
                (server.name, readiness)
            })
            .collect()
    }

    /// Placeholder tool reporting status and optionally forcing a reconnect.
    pub fn status_tool(self: &Arc<Self>) -> Arc<dyn Tool> {
        let host: Weak<Self> = Arc::downgrade(self);
        let parameters = AgentToolParameters::object()
            .boolean("reconnect", "Force reconnect to all MCP servers", false)
            .build();
        Arc::new(AgentTool::new(
            STATUS_TOOL_NAME,
            "MCP Bridge Status",
            "Check the connection status of MCP servers. If MCP tools are not available, \
             call this first to trigger connection. Pass reconnect=true to force reconnect.",
            parameters,
            move |args: ToolArguments, _ctx| {
                let host = host.clone();
                async move {
                    let host = host.upgrade().ok_or(BridgeError::Disposed)?;
                    let StatusArgs { reconnect } = args.deserialize()?;
                    host.status_payload(reconnect).await
                }
            },
        ))
    }

    async fn status_payload(&self, reconnect: bool) -> Result<Value, BridgeError> {
        self.wait_ready().await;
        if reconnect {
            self.force_reconnect().await?;
        }

        let (servers, tool_names) = match self.manager() {
            Some(manager) => (
                manager.get_status(),
                manager
                    .get_all_tools()
                    .iter()
                    .map(|tool| tool.name().to_string())
                    .collect::<Vec<_>>(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Ok(json!({
            "status": "ok",
            "servers": servers,
            "totalTools": tool_names.len(),
            "toolNames": tool_names,
        }))
    }

    /// Dispose the current manager and connect a fresh one with the latest
    /// merged configuration, waiting for it to settle.
    pub async fn force_reconnect(&self) -> Result<(), BridgeError> {
        let servers = self.effective_servers();
        let old = self.lock_state().manager.take();
        if let Some(old) = old {
            old.dispose().await;
        }

        let manager = self.new_manager();
        {
            let mut state = self.lock_state();
            state.manager = Some(manager.clone());
            state.fingerprint = config_fingerprint(&servers);
            state.pending = None;
        }
        tracing::info!(servers = servers.len(), "Forcing MCP reconnect");
        manager.connect(&servers).await
    }

    /// Execute a tool by name, including the placeholder status tool.
    pub async fn call_tool(
        self: &Arc<Self>,
        name: &str,
        args: Value,
        ctx: &ToolExecutionContext,
    ) -> ToolResult {
        if name == STATUS_TOOL_NAME {
            return self
                .status_tool()
                .execute(&ToolArguments::new(args), ctx)
                .await;
        }
        self.wait_ready().await;
        match self.manager() {
            Some(manager) => manager.call_tool(name, args, ctx).await,
            None => ToolResult::execution_error(name, "MCP bridge has not been started"),
        }
    }

    /// Text for the `/mcp` status command.
    pub fn status_text(&self) -> String {
        let Some(manager) = self.manager() else {
            return "MCP Bridge: No active connections".to_string();
        };
        let status = manager.get_status();
        if status.is_empty() {
            return "MCP Bridge: No servers configured".to_string();
        }
        let lines: Vec<String> = status
            .iter()
            .map(|s| {
                format!(
                    "- {} ({}): {} | {} tools",
                    s.name,
                    s.transport,
                    if s.connected { "connected" } else { "disconnected" },
                    s.tool_count
                )
            })
            .collect();
        format!("MCP Bridge Status:\n{}", lines.join("\n"))
    }

    /// Host interception hook; `None` allows the call.
    pub fn before_tool_call(&self, operation: &str, params: &Value) -> Option<BlockDecision> {
        self.safety.as_ref()?.before_tool_call(operation, params)
    }

    /// Dispose the manager and forget connection state.
    pub async fn shutdown(&self) {
        let manager = {
            let mut state = self.lock_state();
            state.pending = None;
            state.fingerprint.clear();
            state.manager.take()
        };
        if let Some(manager) = manager {
            manager.dispose().await;
        }
    }

    fn new_manager(&self) -> BridgeManager {
        BridgeManager::with_options(
            ManagerOptions::builder()
                .maybe_connector(self.connector.clone())
                .backoff(self.backoff)
                .maybe_safety_gate(self.safety.clone())
                .build(),
        )
    }

    fn lock_state(&self) -> MutexGuard<'_, HostState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn spawn_connect(manager: BridgeManager, servers: Vec<ProviderConfig>) -> PendingConnect {
    let handle = tokio::spawn(async move {
        if let Err(e) = manager.connect(&servers).await {
            tracing::error!(error = %e, "MCP connect failed");
        }
    });
    async move {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "MCP connect task panicked");
        }
    }
    .boxed()
    .shared()
}
