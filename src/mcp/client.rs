//! Client side of the tool-invocation protocol.
//!
//! The client performs the `initialize` handshake, discovers the sidecar's
//! tools once, and invokes them on request. It is transport-agnostic; the
//! assistant wires it to a [`super::transport::ProcessTransport`].

use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::protocol::{JsonRpcResponse, RequestId, ToolDescriptor, PROTOCOL_VERSION};
use super::transport::Transport;
use super::McpError;

/// Information reported by the sidecar during the handshake.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

/// Client for one sidecar connection.
pub struct McpClient {
    initialized: bool,
    server_info: Option<ServerInfo>,
    tools: Vec<ToolDescriptor>,
    next_id: AtomicI64,
}

impl McpClient {
    pub fn new() -> Self {
        Self {
            initialized: false,
            server_info: None,
            tools: Vec::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Tools discovered by [`McpClient::discover_tools`].
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<ServerInfo, McpError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "deskresearch",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }
        });
        self.send(transport, &request).await?;

        let response = self.read_response(transport).await?;
        let result = response
            .result
            .ok_or_else(|| McpError::Protocol("initialize returned no result".to_string()))?;

        let server_info = ServerInfo {
            name: result["serverInfo"]["name"].as_str().unwrap_or("unknown").to_string(),
            version: result["serverInfo"]["version"].as_str().unwrap_or("0.0.0").to_string(),
            protocol_version: result["protocolVersion"]
                .as_str()
                .unwrap_or(PROTOCOL_VERSION)
                .to_string(),
        };
        info!(server = %server_info.name, version = %server_info.version, "tool sidecar initialized");

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        self.send(transport, &notification).await?;

        self.server_info = Some(server_info.clone());
        self.initialized = true;
        Ok(server_info)
    }

    /// Ask the sidecar for its tool list. Called once per session.
    pub async fn discover_tools<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Vec<ToolDescriptor>, McpError> {
        if !self.initialized {
            return Err(McpError::NotInitialized);
        }

        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "tools/list",
            "params": {}
        });
        self.send(transport, &request).await?;

        let response = self.read_response(transport).await?;
        let result = response
            .result
            .ok_or_else(|| McpError::Protocol("tools/list returned no result".to_string()))?;
        let raw_tools = result["tools"]
            .as_array()
            .ok_or_else(|| McpError::Protocol("tools/list result has no tools array".to_string()))?;

        let tools: Vec<ToolDescriptor> = raw_tools
            .iter()
            .filter_map(|value| serde_json::from_value(value.clone()).ok())
            .collect();

        debug!(count = tools.len(), "discovered sidecar tools");
        self.tools = tools.clone();
        Ok(tools)
    }

    /// Invoke a tool with structured arguments.
    pub async fn call_tool<T: Transport>(
        &self,
        transport: &mut T,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, McpError> {
        if !self.initialized {
            return Err(McpError::NotInitialized);
        }

        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "tools/call",
            "params": {
                "name": tool_name,
                "arguments": arguments
            }
        });
        self.send(transport, &request).await?;

        let response = self.read_response(transport).await?;
        if let Some(error) = response.error {
            return Err(McpError::Tool(format!("{tool_name}: {}", error.message)));
        }
        response
            .result
            .ok_or_else(|| McpError::Protocol(format!("{tool_name} returned no result")))
    }

    async fn send<T: Transport>(
        &self,
        transport: &mut T,
        message: &Value,
    ) -> Result<(), McpError> {
        let raw = serde_json::to_string(message)
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        transport.write_message(&raw).await
    }

    async fn read_response<T: Transport>(
        &self,
        transport: &mut T,
    ) -> Result<JsonRpcResponse, McpError> {
        let raw = transport
            .read_message()
            .await?
            .ok_or_else(|| McpError::Transport("sidecar closed the connection".to_string()))?;

        let response: JsonRpcResponse = serde_json::from_str(&raw)
            .map_err(|e| McpError::Protocol(format!("invalid response: {e}")))?;

        if let Some(error) = &response.error {
            warn!(code = error.code, message = %error.message, "sidecar returned an error");
        }
        Ok(response)
    }
}

impl Default for McpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a `tools/call` result into plain text for the model.
///
/// The result's `content` array may hold several text parts; anything else
/// is passed through as compact JSON so the model still sees it.
pub fn tool_result_text(result: &Value) -> String {
    match result["content"].as_array() {
        Some(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect();
            if texts.is_empty() {
                result.to_string()
            } else {
                texts.join("\n")
            }
        }
        None => result.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::transport::{ChannelTransport, Transport};
    use serde_json::json;

    /// Scripted sidecar: answers each request with the next canned result.
    async fn run_fake_sidecar(mut transport: ChannelTransport, results: Vec<Value>) {
        let mut results = results.into_iter();
        while let Ok(Some(raw)) = transport.read_message().await {
            let request: Value = serde_json::from_str(&raw).unwrap();
            // Notifications carry no id and get no reply.
            if request.get("id").is_none() {
                continue;
            }
            let reply = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": results.next().unwrap_or(json!({}))
            });
            if transport.write_message(&reply.to_string()).await.is_err() {
                break;
            }
        }
    }

    fn initialize_result() -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {"name": "fake-sidecar", "version": "1.2.3"}
        })
    }

    #[tokio::test]
    async fn handshake_records_server_info() {
        let (mut client_side, server_side) = ChannelTransport::pair(8);
        tokio::spawn(run_fake_sidecar(server_side, vec![initialize_result()]));

        let mut client = McpClient::new();
        assert!(!client.is_initialized());

        let info = client.initialize(&mut client_side).await.unwrap();
        assert_eq!(info.name, "fake-sidecar");
        assert!(client.is_initialized());
    }

    #[tokio::test]
    async fn discovery_parses_tool_descriptors() {
        let (mut client_side, server_side) = ChannelTransport::pair(8);
        tokio::spawn(run_fake_sidecar(
            server_side,
            vec![
                initialize_result(),
                json!({"tools": [
                    {"name": "web_search", "description": "Search the web",
                     "inputSchema": {"type": "object"}},
                    {"name": "ask", "description": "Ask a question"}
                ]}),
            ],
        ));

        let mut client = McpClient::new();
        client.initialize(&mut client_side).await.unwrap();
        let tools = client.discover_tools(&mut client_side).await.unwrap();

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "web_search");
        assert_eq!(client.tools().len(), 2);
    }

    #[tokio::test]
    async fn call_tool_returns_result_payload() {
        let (mut client_side, server_side) = ChannelTransport::pair(8);
        tokio::spawn(run_fake_sidecar(
            server_side,
            vec![
                initialize_result(),
                json!({"content": [{"type": "text", "text": "it works"}]}),
            ],
        ));

        let mut client = McpClient::new();
        client.initialize(&mut client_side).await.unwrap();
        let result = client
            .call_tool(&mut client_side, "echo", json!({"text": "hi"}))
            .await
            .unwrap();

        assert_eq!(tool_result_text(&result), "it works");
    }

    #[tokio::test]
    async fn calls_before_initialize_are_rejected() {
        let (mut client_side, _server_side) = ChannelTransport::pair(1);

        let mut client = McpClient::new();
        assert!(client.discover_tools(&mut client_side).await.is_err());
        assert!(client
            .call_tool(&mut client_side, "echo", json!({}))
            .await
            .is_err());
    }

    #[test]
    fn tool_result_text_flattens_parts() {
        let result = json!({"content": [
            {"type": "text", "text": "line one"},
            {"type": "text", "text": "line two"}
        ]});
        assert_eq!(tool_result_text(&result), "line one\nline two");

        let opaque = json!({"status": "ok"});
        assert_eq!(tool_result_text(&opaque), "{\"status\":\"ok\"}");
    }
}
