//! Streamable-HTTP servers bridged end to end against wiremock.

use std::{collections::HashSet, time::Duration};

use mcp_bridge::config::ProviderConfig;
use mcp_bridge::mcp::{BridgeManager, ProviderConnector, RmcpConnector};
use mcp_bridge::tools::{Tool, ToolExecutionContext};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn mcp_tools_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string"
            }
        }
    })
}

fn mock_mcp_handler(
    server_name: &'static str,
    tools: &'static [(&'static str, &'static str)],
) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        let body: serde_json::Value = request.body_json().unwrap_or_else(|_| json!({}));
        let method = body.get("method").and_then(|value| value.as_str()).unwrap_or_default();
        let id = body.get("id").cloned().unwrap_or_else(|| json!(1));

        match method {
            "initialize" => ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": body["params"]["protocolVersion"].clone(),
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": server_name,
                        "version": "0.1.0"
                    }
                }
            })),
            "tools/list" => {
                let tool_definitions: Vec<_> = tools
                    .iter()
                    .map(|(tool_name, description)| {
                        json!({
                            "name": tool_name,
                            "description": description,
                            "inputSchema": mcp_tools_schema()
                        })
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "tools": tool_definitions,
                        "nextCursor": null
                    }
                }))
            }
            "tools/call" => {
                let called_tool = body
                    .get("params")
                    .and_then(|params| params.get("name"))
                    .and_then(|name| name.as_str())
                    .unwrap_or_default();
                let arguments = body
                    .get("params")
                    .and_then(|params| params.get("arguments"))
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "content": [{ "type": "text", "text": format!("{server_name}:{called_tool}") }],
                        "structuredContent": {
                            "server": server_name,
                            "tool": called_tool,
                            "arguments": arguments
                        },
                        "isError": false
                    }
                }))
            }
            "notifications/initialized" => ResponseTemplate::new(202),
            _ => ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {}
            })),
        }
    }
}

async fn start_mock(
    server_name: &'static str,
    tools: &'static [(&'static str, &'static str)],
) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(mock_mcp_handler(server_name, tools))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn request_methods(requests: &[Request]) -> HashSet<String> {
    requests
        .iter()
        .filter_map(|request| {
            request
                .body_json::<serde_json::Value>()
                .ok()
                .and_then(|body| {
                    body.get("method")
                        .and_then(|method| method.as_str())
                        .map(str::to_string)
                })
        })
        .collect()
}

fn post_headers_match(requests: &[Request], header: &str, expected: &str) -> bool {
    requests
        .iter()
        .filter(|request| request.method.as_str() == "POST")
        .all(|request| {
            request
                .headers
                .get(header)
                .and_then(|value| value.to_str().ok())
                == Some(expected)
        })
}

#[tokio::test]
async fn connector_discovers_and_executes_tools_with_custom_headers() {
    let server = start_mock("unit-alpha", &[("weather", "Mock weather tool"), ("echo", "Mock echo tool")]).await;
    let mut config = ProviderConfig::stream("alpha", format!("{}/mcp", server.uri()));
    config.headers.insert("x-bridge-scope".into(), "qa".into());

    let session = timeout(Duration::from_secs(5), RmcpConnector.connect(&config))
        .await
        .expect("connect should complete before timeout")
        .expect("streamable HTTP session should initialize");

    let tools = timeout(Duration::from_secs(5), session.client.list_tools())
        .await
        .expect("tools/list should complete before timeout")
        .expect("server should return tools");
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().any(|tool| tool.name == "weather"));

    let mut arguments = serde_json::Map::new();
    arguments.insert("query".into(), json!("today"));
    let raw = timeout(
        Duration::from_secs(5),
        session.client.call_tool("weather", Some(arguments)),
    )
    .await
    .expect("tools/call should complete before timeout")
    .expect("server should execute tool");
    assert_eq!(raw["content"][0]["text"], "unit-alpha:weather");
    assert_eq!(raw["structuredContent"]["arguments"]["query"], "today");

    session.client.close().await.expect("close should succeed");

    let requests = server
        .received_requests()
        .await
        .expect("server should have captured requests");
    let methods = request_methods(&requests);
    assert!(methods.contains("initialize"));
    assert!(methods.contains("tools/list"));
    assert!(methods.contains("tools/call"));
    assert!(post_headers_match(&requests, "x-bridge-scope", "qa"));
}

#[tokio::test]
async fn manager_bridges_multiple_http_servers_with_isolated_routing() {
    let server_a = start_mock("alpha", &[("search", "Alpha search tool"), ("ping", "Alpha ping tool")]).await;
    let server_b = start_mock("beta", &[("search", "Beta search tool")]).await;

    let manager = BridgeManager::new();
    timeout(
        Duration::from_secs(10),
        manager.connect(&[
            ProviderConfig::stream("alpha", format!("{}/mcp", server_a.uri())),
            ProviderConfig::stream("beta", format!("{}/mcp", server_b.uri())),
        ]),
    )
    .await
    .expect("connect should complete before timeout")
    .expect("manager should accept both servers");

    let names: Vec<String> = manager
        .get_all_tools()
        .iter()
        .map(|tool| tool.name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["mcp__alpha__search", "mcp__alpha__ping", "mcp__beta__search"]
    );

    let alpha = manager
        .call_tool(
            "mcp__alpha__search",
            json!({ "query": "news" }),
            &ToolExecutionContext::new("call-a"),
        )
        .await;
    assert_eq!(alpha.first_text(), Some("alpha:search"));
    assert_eq!(alpha.details["mcpResult"]["structuredContent"]["server"], "alpha");

    let beta = manager
        .call_tool(
            "mcp__beta__search",
            json!({ "query": "status" }),
            &ToolExecutionContext::new("call-b"),
        )
        .await;
    assert_eq!(beta.first_text(), Some("beta:search"));

    manager.dispose().await;
    assert!(manager.get_status().is_empty());
}

#[tokio::test]
async fn unreachable_server_is_reported_without_blocking_others() {
    let server = start_mock("alpha", &[("search", "Alpha search tool")]).await;

    let manager = BridgeManager::new();
    let mut unreachable = ProviderConfig::stream("down", "http://127.0.0.1:1/mcp");
    unreachable.timeout_ms = Some(2_000);
    manager
        .connect(&[
            unreachable,
            ProviderConfig::stream("alpha", format!("{}/mcp", server.uri())),
        ])
        .await
        .unwrap();

    let status = manager.get_status();
    assert_eq!(status[0].name, "down");
    assert!(!status[0].connected);
    assert!(status[0].last_error.is_some());
    assert!(status[1].connected);
    assert_eq!(status[1].tool_count, 1);
    manager.dispose().await;
}
