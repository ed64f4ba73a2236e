//! Message transports for the tool-invocation protocol.
//!
//! Messages are framed as newline-delimited JSON. [`ProcessTransport`]
//! speaks to a spawned sidecar over its stdio pipes; [`ChannelTransport`]
//! swaps the pipes for in-process channels so tests can script the other
//! end without a subprocess.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::McpError;

/// Reads and writes framed JSON-RPC messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Read the next message; `Ok(None)` means the peer closed its end.
    async fn read_message(&mut self) -> Result<Option<String>, McpError>;

    /// Write one message, including framing and flush.
    async fn write_message(&mut self, message: &str) -> Result<(), McpError>;
}

/// Transport over a spawned child process's stdin/stdout.
pub struct ProcessTransport {
    child_stdin: tokio::process::ChildStdin,
    reader: BufReader<tokio::process::ChildStdout>,
}

impl ProcessTransport {
    /// Spawn the sidecar and wire its pipes.
    ///
    /// The returned `Child` handle owns the process; dropping or killing it
    /// releases the subprocess regardless of how the session ended.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<(Self, tokio::process::Child), McpError> {
        let mut child = tokio::process::Command::new(command)
            .args(args)
            .envs(env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::Transport(format!("failed to spawn {command}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("child stdout unavailable".to_string()))?;

        Ok((Self { child_stdin: stdin, reader: BufReader::new(stdout) }, child))
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn read_message(&mut self) -> Result<Option<String>, McpError> {
        let mut line = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        if bytes_read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end().to_string()))
    }

    async fn write_message(&mut self, message: &str) -> Result<(), McpError> {
        self.child_stdin
            .write_all(message.as_bytes())
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        self.child_stdin
            .write_all(b"\n")
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        self.child_stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// In-process transport backed by mpsc channels, for tests.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<String>,
    sender: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a connected pair; what one half writes, the other reads.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);
        (
            Self { receiver: a_rx, sender: b_tx },
            Self { receiver: b_rx, sender: a_tx },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn read_message(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.receiver.recv().await)
    }

    async fn write_message(&mut self, message: &str) -> Result<(), McpError> {
        self.sender
            .send(message.to_string())
            .await
            .map_err(|_| McpError::Transport("peer closed the channel".to_string()))
    }
}
