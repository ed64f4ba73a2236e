//! Chat assistant core: session history and the tool-augmented reply loop.
//!
//! [`ChatSession`] is an append-only turn list living for one interactive
//! session, never persisted. [`ChatAgent::respond`] takes the history
//! immutably, so a failed turn cannot corrupt it; the caller commits the
//! user/assistant pair only after the reply stream completes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::{CompletionStream, Message, ModelCaller};
use crate::mcp::{McpError, McpToolbox, ToolDescriptor};

/// Base system instruction for the assistant.
pub const ASSISTANT_ROLE: &str =
    "You are a helpful research assistant. Answer clearly and concisely.";

/// Upper bound on tool-call rounds within one turn.
const MAX_TOOL_ROUNDS: usize = 4;

/// Who spoke a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One committed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Append-only conversation history for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Commit a completed exchange. Called only after the assistant reply
    /// finished successfully, so a failed turn leaves the history intact.
    pub fn commit_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(ChatTurn { role: ChatRole::User, content: user.into() });
        self.turns.push(ChatTurn { role: ChatRole::Assistant, content: assistant.into() });
    }
}

/// Something that can execute sidecar tools.
///
/// [`McpToolbox`] is the production implementation; tests script their own.
#[async_trait::async_trait]
pub trait ToolInvoker: Send {
    fn tools(&self) -> &[ToolDescriptor];

    async fn call(&mut self, tool_name: &str, arguments: Value) -> Result<String, McpError>;
}

#[async_trait::async_trait]
impl ToolInvoker for McpToolbox {
    fn tools(&self) -> &[ToolDescriptor] {
        McpToolbox::tools(self)
    }

    async fn call(&mut self, tool_name: &str, arguments: Value) -> Result<String, McpError> {
        McpToolbox::call(self, tool_name, arguments).await
    }
}

/// A tool call requested by the model.
#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ToolCallEnvelope {
    tool_calls: Vec<ToolCallRequest>,
}

/// Drives one assistant reply, running tool rounds until the model answers
/// in plain text, then handing the final answer back as a stream.
pub struct ChatAgent {
    model: Arc<dyn ModelCaller>,
    max_tool_rounds: usize,
}

impl ChatAgent {
    pub fn new(model: Arc<dyn ModelCaller>) -> Self {
        Self { model, max_tool_rounds: MAX_TOOL_ROUNDS }
    }

    /// Produce the assistant's reply to `prompt` given the committed
    /// history. With tools available, completion rounds run until the model
    /// stops requesting calls (bounded by the round limit); without tools
    /// the reply is streamed directly.
    pub async fn respond(
        &self,
        history: &ChatSession,
        prompt: &str,
        mut tools: Option<&mut dyn ToolInvoker>,
    ) -> Result<CompletionStream, AgentError> {
        let mut messages = self.build_messages(history, prompt, tools.as_deref());

        let invoker = match tools.as_deref_mut() {
            Some(invoker) if !invoker.tools().is_empty() => invoker,
            _ => return Ok(self.model.stream(&messages).await?),
        };

        for _round in 0..self.max_tool_rounds {
            let response = self.model.complete(&messages).await?;
            let calls = match parse_tool_calls(&response) {
                Some(calls) if !calls.is_empty() => calls,
                _ => return Ok(CompletionStream::from_complete(response)),
            };

            messages.push(Message::assistant(&response));
            for call in calls {
                debug!(tool = %call.name, "invoking sidecar tool");
                let output = invoker.call(&call.name, call.arguments).await?;
                messages.push(Message::user(format!(
                    "Tool {} returned:\n{}",
                    call.name, output
                )));
            }
        }

        // Round limit reached; take whatever the model says now as final.
        warn!("tool round limit reached, forcing a final answer");
        let response = self.model.complete(&messages).await?;
        Ok(CompletionStream::from_complete(response))
    }

    fn build_messages(
        &self,
        history: &ChatSession,
        prompt: &str,
        tools: Option<&dyn ToolInvoker>,
    ) -> Vec<Message> {
        let mut system = String::from(ASSISTANT_ROLE);
        if let Some(invoker) = tools {
            if !invoker.tools().is_empty() {
                system.push_str("\n\n");
                system.push_str(&tools_section(invoker.tools()));
            }
        }

        let mut messages = vec![Message::system(system)];
        for turn in history.turns() {
            messages.push(match turn.role {
                ChatRole::User => Message::user(&turn.content),
                ChatRole::Assistant => Message::assistant(&turn.content),
            });
        }
        messages.push(Message::user(prompt));
        messages
    }
}

/// Describe the available tools and the calling convention to the model.
fn tools_section(tools: &[ToolDescriptor]) -> String {
    let mut section = String::from("You have access to the following tools:\n\n");
    for tool in tools {
        section.push_str(&format!(
            "**{}**: {}\nParameters: {}\n\n",
            tool.name,
            tool.description,
            serde_json::to_string(&tool.input_schema).unwrap_or_default()
        ));
    }
    section.push_str(
        "To use a tool, respond with only a JSON object in this format:\n\
         {\"tool_calls\": [{\"name\": \"tool_name\", \"arguments\": {...}}]}\n\
         Otherwise respond normally.",
    );
    section
}

/// Extract tool calls from a model response, if it is a tool-call envelope.
fn parse_tool_calls(response: &str) -> Option<Vec<ToolCallRequest>> {
    let envelope: ToolCallEnvelope = serde_json::from_str(response.trim()).ok()?;
    Some(envelope.tool_calls)
}
