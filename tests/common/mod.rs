//! Shared test helpers and a scriptable in-memory MCP connector.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mcp_bridge::config::ProviderConfig;
use mcp_bridge::error::BridgeError;
use mcp_bridge::mcp::{MCPToolSchema, ProviderClient, ProviderConnector, ProviderSession};
use rmcp::model::JsonObject;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// One recorded `tools/call`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: String,
    pub arguments: Option<JsonObject>,
}

/// A fake session for one server.
pub struct MockClient {
    server: String,
    tools: Vec<MCPToolSchema>,
    call_delay: Option<Duration>,
    list_delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    closed: AtomicBool,
    terminate: Mutex<Option<oneshot::Sender<String>>>,
}

impl MockClient {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Simulate the server going away.
    pub fn kill(&self, reason: &str) {
        if let Some(tx) = self.terminate.lock().unwrap().take() {
            let _ = tx.send(reason.to_string());
        }
    }
}

#[async_trait]
impl ProviderClient for MockClient {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>, BridgeError> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Option<JsonObject>) -> Result<Value, BridgeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            operation: name.to_string(),
            arguments: arguments.clone(),
        });
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(json!({
            "content": [{ "type": "text", "text": format!("{}:{}", self.server, name) }],
            "structuredContent": { "server": self.server, "tool": name, "arguments": arguments },
            "isError": false
        }))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.closed.store(true, Ordering::SeqCst);
        self.kill("closed by client");
        Ok(())
    }
}

#[derive(Default, Clone)]
struct ServerScript {
    tools: Vec<MCPToolSchema>,
    failing: bool,
    call_delay: Option<Duration>,
    connect_delay: Option<Duration>,
    list_delay: Option<Duration>,
}

/// Connector that hands out [`MockClient`] sessions by server name.
#[derive(Default)]
pub struct MockConnector {
    scripts: Mutex<HashMap<String, ServerScript>>,
    connects: Mutex<HashMap<String, u32>>,
    sessions: Mutex<HashMap<String, Vec<Arc<MockClient>>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a server exposing `tools` (name, description).
    pub fn add_server(&self, name: &str, tools: &[(&str, &str)]) {
        let tools = tools
            .iter()
            .map(|(tool, description)| {
                MCPToolSchema::new(*tool)
                    .with_description(*description)
                    .with_input_schema(json!({
                        "type": "object",
                        "properties": { "query": { "type": "string" } }
                    }))
            })
            .collect();
        self.scripts.lock().unwrap().insert(
            name.to_string(),
            ServerScript {
                tools,
                ..Default::default()
            },
        );
    }

    pub fn set_failing(&self, name: &str, failing: bool) {
        if let Some(script) = self.scripts.lock().unwrap().get_mut(name) {
            script.failing = failing;
        }
    }

    pub fn set_call_delay(&self, name: &str, delay: Duration) {
        if let Some(script) = self.scripts.lock().unwrap().get_mut(name) {
            script.call_delay = Some(delay);
        }
    }

    /// Stall the handshake for `delay`.
    pub fn set_connect_delay(&self, name: &str, delay: Duration) {
        if let Some(script) = self.scripts.lock().unwrap().get_mut(name) {
            script.connect_delay = Some(delay);
        }
    }

    /// Stall `tools/list` for `delay`.
    pub fn set_list_delay(&self, name: &str, delay: Duration) {
        if let Some(script) = self.scripts.lock().unwrap().get_mut(name) {
            script.list_delay = Some(delay);
        }
    }

    pub fn connect_count(&self, name: &str) -> u32 {
        self.connects.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn latest_client(&self, name: &str) -> Option<Arc<MockClient>> {
        self.sessions
            .lock()
            .unwrap()
            .get(name)
            .and_then(|sessions| sessions.last().cloned())
    }

    pub fn all_clients(&self, name: &str) -> Vec<Arc<MockClient>> {
        self.sessions
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(&self, config: &ProviderConfig) -> Result<ProviderSession, BridgeError> {
        *self
            .connects
            .lock()
            .unwrap()
            .entry(config.name.clone())
            .or_default() += 1;

        let script = self.scripts.lock().unwrap().get(&config.name).cloned();
        let script = match script {
            Some(script) if !script.failing => script,
            Some(_) => return Err(BridgeError::connect(&config.name, "connection refused")),
            None => return Err(BridgeError::connect(&config.name, "unknown mock server")),
        };
        if let Some(delay) = script.connect_delay {
            tokio::time::sleep(delay).await;
        }

        let (tx, rx) = oneshot::channel();
        let client = Arc::new(MockClient {
            server: config.name.clone(),
            tools: script.tools,
            call_delay: script.call_delay,
            list_delay: script.list_delay,
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            terminate: Mutex::new(Some(tx)),
        });
        self.sessions
            .lock()
            .unwrap()
            .entry(config.name.clone())
            .or_default()
            .push(Arc::clone(&client));

        Ok(ProviderSession {
            client,
            closed: rx,
        })
    }
}

/// Stream config whose URL is never dialled by the mock connector.
pub fn server(name: &str) -> ProviderConfig {
    ProviderConfig::stream(name, format!("http://mock.invalid/{name}"))
}

/// Poll `condition` until it holds, yielding to spawned tasks in between.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
