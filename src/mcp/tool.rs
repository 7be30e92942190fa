//! Host-facing tools wrapping server operations.

use std::sync::Weak;

use async_trait::async_trait;

use super::naming::build_tool_name;
use super::schema::{normalize_parameters, MCPToolSchema};
use crate::safety::blocklist::{blocked_hint, BLOCKED_NOTICE};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::types::{AgentToolParameters, ToolResult};

/// Routes a bridged tool call to the live session of its server.
#[async_trait]
pub(crate) trait ToolDispatch: Send + Sync {
    async fn dispatch(
        &self,
        tool: &BridgedTool,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> ToolResult;
}

/// One server operation exposed as a host tool.
///
/// Built per discovery cycle. Execution looks up the server's current
/// session at call time, so a tool outliving a reconnect still works.
pub struct BridgedTool {
    name: String,
    operation: String,
    server: String,
    label: String,
    description: String,
    parameters: AgentToolParameters,
    blocked: bool,
    dispatch: Weak<dyn ToolDispatch>,
}

impl BridgedTool {
    pub(crate) fn new(
        server: &str,
        schema: &MCPToolSchema,
        blocked: bool,
        dispatch: Weak<dyn ToolDispatch>,
    ) -> Self {
        let mut description = schema
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("MCP tool from {server}"));
        if blocked {
            description.push_str(BLOCKED_NOTICE);
        }

        Self {
            name: build_tool_name(server, &schema.name),
            operation: schema.name.clone(),
            server: server.to_string(),
            label: format!("MCP: {server}/{}", schema.name),
            description,
            parameters: normalize_parameters(schema.input_schema.as_ref()),
            blocked,
            dispatch,
        }
    }

    /// Operation name as the server knows it.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}

#[async_trait]
impl Tool for BridgedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> ToolResult {
        if self.blocked {
            tracing::warn!(tool = %self.name, server = %self.server, "Blocked tool call");
            return ToolResult::blocked(&self.name, &self.operation, blocked_hint(&self.server, &self.operation));
        }

        match self.dispatch.upgrade() {
            Some(dispatch) => dispatch.dispatch(self, args, ctx).await,
            None => ToolResult::disconnected(&self.server),
        }
    }
}

impl std::fmt::Debug for BridgedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedTool")
            .field("name", &self.name)
            .field("server", &self.server)
            .field("operation", &self.operation)
            .field("blocked", &self.blocked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingDispatch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ToolDispatch for CountingDispatch {
        async fn dispatch(
            &self,
            tool: &BridgedTool,
            _args: &ToolArguments,
            _ctx: &ToolExecutionContext,
        ) -> ToolResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ToolResult::text(tool.operation(), json!({}))
        }
    }

    fn dispatch() -> (Arc<CountingDispatch>, Weak<dyn ToolDispatch>) {
        let strong = Arc::new(CountingDispatch {
            calls: AtomicUsize::new(0),
        });
        let as_dyn: Arc<dyn ToolDispatch> = strong.clone();
        let weak = Arc::downgrade(&as_dyn);
        (strong, weak)
    }

    #[test]
    fn metadata_is_namespaced_and_defaulted() {
        let (_strong, weak) = dispatch();
        let tool = BridgedTool::new("chrome-devtools", &MCPToolSchema::new("new_page"), false, weak);
        assert_eq!(tool.name(), "mcp__chrome_devtools__new_page");
        assert_eq!(tool.label(), "MCP: chrome-devtools/new_page");
        assert_eq!(tool.description(), "MCP tool from chrome-devtools");
        assert_eq!(tool.parameters().schema["type"], "object");
    }

    #[tokio::test]
    async fn blocked_tool_never_dispatches() {
        let (strong, _) = dispatch();
        let as_dyn: Arc<dyn ToolDispatch> = strong.clone();
        let tool = BridgedTool::new(
            "chrome-devtools",
            &MCPToolSchema::new("close_page").with_description("Close a page"),
            true,
            Arc::downgrade(&as_dyn),
        );
        assert!(tool.description().ends_with(BLOCKED_NOTICE));

        let result = tool
            .execute(&ToolArguments::new(json!({})), &ToolExecutionContext::default())
            .await;
        assert!(result.is_blocked());
        assert!(result.first_text().unwrap().contains("new_page"));
        assert_eq!(strong.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explicitly_blocked_tool_gets_no_close_page_hint() {
        let (_strong, weak) = dispatch();
        let tool = BridgedTool::new("chrome-devtools", &MCPToolSchema::new("navigate"), true, weak);

        let result = tool
            .execute(&ToolArguments::default(), &ToolExecutionContext::default())
            .await;
        assert!(result.is_blocked());
        let text = result.first_text().unwrap();
        assert!(text.contains("navigate"));
        assert!(!text.contains("close browser tabs"));
    }

    #[tokio::test]
    async fn live_tool_dispatches_and_dropped_manager_reports_disconnected() {
        let (strong, _) = dispatch();
        let as_dyn: Arc<dyn ToolDispatch> = strong.clone();
        let tool = BridgedTool::new("files", &MCPToolSchema::new("read"), false, Arc::downgrade(&as_dyn));

        let result = tool
            .execute(&ToolArguments::default(), &ToolExecutionContext::default())
            .await;
        assert_eq!(result.first_text(), Some("read"));
        assert_eq!(strong.calls.load(Ordering::SeqCst), 1);

        drop(as_dyn);
        drop(strong);
        let result = tool
            .execute(&ToolArguments::default(), &ToolExecutionContext::default())
            .await;
        assert_eq!(result.details["error"], "server_disconnected");
    }
}
