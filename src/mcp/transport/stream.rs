use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, ServiceExt};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;

use super::{MCPRunningService, MCPTransport};

/// Streamed HTTP MCP transport (for remote MCP servers).
pub struct StreamTransport {
    url: String,
    headers: BTreeMap<String, String>,
}

impl StreamTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers sent with every request; invalid entries are skipped with a warning.
    fn header_map(&self) -> HashMap<HeaderName, HeaderValue> {
        let mut headers = HashMap::new();
        for (name, value) in &self.headers {
            let parsed_name = match HeaderName::from_bytes(name.as_bytes()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(header = %name, error = %e, "Skipping invalid MCP header name");
                    continue;
                }
            };
            match HeaderValue::from_str(value) {
                Ok(parsed_value) => {
                    headers.insert(parsed_name, parsed_value);
                }
                Err(e) => {
                    tracing::warn!(header = %name, error = %e, "Skipping invalid MCP header value");
                }
            }
        }
        headers
    }

    fn transport_config(&self) -> StreamableHttpClientTransportConfig {
        StreamableHttpClientTransportConfig::with_uri(self.url.clone())
            .custom_headers(self.header_map())
    }
}

#[async_trait]
impl MCPTransport for StreamTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        tracing::debug!(url = %self.url, headers = self.headers.len(), "Opening MCP stream");
        let transport = StreamableHttpClientTransport::from_config(self.transport_config());
        client_info.into_dyn().serve(transport).await
    }

    fn kind(&self) -> &'static str {
        "stream"
    }
}
