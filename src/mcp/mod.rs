//! Tool-invocation boundary (assistant application only).
//!
//! A sidecar process exposes callable tools over JSON-RPC 2.0, framed as
//! newline-delimited JSON on its stdio pipes. The assistant discovers the
//! tool list once per session and invokes tools with structured arguments.

pub mod client;
pub mod protocol;
pub mod transport;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

pub use client::{tool_result_text, McpClient, ServerInfo};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, ToolDescriptor};
pub use transport::{ChannelTransport, ProcessTransport, Transport};

/// Errors from the tool sidecar.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("sidecar transport failed: {0}")]
    Transport(String),

    #[error("sidecar protocol violation: {0}")]
    Protocol(String),

    #[error("sidecar is not initialized")]
    NotInitialized,

    #[error("tool call failed: {0}")]
    Tool(String),
}

/// A connected sidecar: spawned process, transport, and initialized client
/// bundled together. Constructed once at startup and held in the
/// application state; dropping it tears the subprocess down.
pub struct McpToolbox {
    client: McpClient,
    transport: ProcessTransport,
    child: tokio::process::Child,
}

impl McpToolbox {
    /// Spawn the sidecar, shake hands, and discover its tools.
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, McpError> {
        let (mut transport, child) = ProcessTransport::spawn(command, args, env).await?;
        let mut client = McpClient::new();
        client.initialize(&mut transport).await?;
        let tools = client.discover_tools(&mut transport).await?;
        info!(command, tools = tools.len(), "tool sidecar connected");
        Ok(Self { client, transport, child })
    }

    /// Tool descriptors discovered at connect time.
    pub fn tools(&self) -> &[ToolDescriptor] {
        self.client.tools()
    }

    /// Invoke one tool and return its flattened text output.
    pub async fn call(&mut self, tool_name: &str, arguments: Value) -> Result<String, McpError> {
        let result = self
            .client
            .call_tool(&mut self.transport, tool_name, arguments)
            .await?;
        Ok(tool_result_text(&result))
    }

    /// Terminate the sidecar process.
    pub async fn shutdown(mut self) {
        let _ = self.child.kill().await;
    }
}
