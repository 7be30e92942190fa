//! CLI command handlers.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::host::BridgeHost;
use crate::safety::gate::{SafetyDecision, SafetyGate};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::types::ToolResult;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `mcp-bridge status`.
pub async fn handle_status(host: &Arc<BridgeHost>) -> CommandResult {
    if host.effective_servers().is_empty() {
        println!("MCP Bridge: No servers configured");
        return Ok(());
    }
    host.tools();
    host.wait_ready().await;
    println!("{}", host.status_text());
    Ok(())
}

/// Handle `mcp-bridge tools`.
pub async fn handle_tools(host: &Arc<BridgeHost>, as_json: bool) -> CommandResult {
    host.tools();
    host.wait_ready().await;
    let tools = host.tools();

    if as_json {
        let defs: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "label": tool.label(),
                    "description": tool.description(),
                    "parameters": tool.parameters().schema,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&defs)?);
        return Ok(());
    }

    if tools.is_empty() {
        println!("No tools available");
    }
    for tool in &tools {
        println!("{}  {}", tool.name(), tool.label());
    }
    Ok(())
}

/// Handle `mcp-bridge call <tool> --args <json>`.
pub async fn handle_call(host: &Arc<BridgeHost>, tool: &str, raw_args: &str) -> CommandResult {
    let args = ToolArguments::parse(raw_args)?;
    host.tools();

    let ctx = ToolExecutionContext::new(Uuid::new_v4().to_string());
    let result = host.call_tool(tool, args.raw().clone(), &ctx).await;
    for block in &result.content {
        if let Some(text) = block.as_text() {
            println!("{text}");
        }
    }
    if result.is_error() {
        return Err(call_failure(tool, &result).into());
    }
    Ok(())
}

fn call_failure(tool: &str, result: &ToolResult) -> BridgeError {
    let message = result
        .details
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("returned an error");
    BridgeError::ToolExecution {
        tool_name: tool.to_string(),
        message: message.to_string(),
    }
}

/// Handle `mcp-bridge check <command...>`.
///
/// Uses the configured gate when one is installed, otherwise the built-in
/// browser rules.
pub fn handle_check(host: &BridgeHost, words: &[String]) -> CommandResult {
    let command = words.join(" ");
    let decision = match host.safety_gate() {
        Some(gate) => gate.evaluate(&command),
        None => SafetyGate::browser_default().evaluate(&command),
    };
    match decision {
        SafetyDecision::Allow => println!("allowed: {command}"),
        SafetyDecision::Block(block) => {
            println!("{}", block.reason);
            return Err("command blocked".into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_call_carries_the_tool_error() {
        let result = ToolResult::execution_error("mcp__files__read", "no such file");
        let err = call_failure("mcp__files__read", &result);
        assert!(matches!(
            &err,
            BridgeError::ToolExecution { tool_name, message }
                if tool_name == "mcp__files__read" && message == "no such file"
        ));
    }

    #[test]
    fn blocked_call_reports_the_block() {
        let result = ToolResult::blocked("mcp__chrome_devtools__close_page", "close_page", None);
        let err = call_failure("mcp__chrome_devtools__close_page", &result);
        assert_eq!(
            err.to_string(),
            "Tool execution error: mcp__chrome_devtools__close_page: tool_blocked"
        );
    }
}
