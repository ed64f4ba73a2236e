//! Error types for the research pipeline and its collaborators.
//!
//! Each external boundary owns a typed error enum (`SearchError`,
//! `ExtractError`, `McpError`, `RenderError`, `ModelError`) which rolls up
//! into the top-level [`AgentError`]. The `Display` strings double as the
//! user-visible failure messages, so they must stay human-readable and free
//! of internal identifiers.

use thiserror::Error;

use crate::llm::ModelError;
use crate::mcp::McpError;
use crate::render::RenderError;
use crate::search::SearchError;

/// Top-level error for both applications.
///
/// Extraction failures have no variant here: they are recovered locally by
/// the evidence gatherer and never abort a request.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing or invalid startup configuration. Fatal at process start.
    #[error("configuration error: {0}")]
    Config(String),

    /// The search capability failed. Fails the whole request, no retry.
    #[error("web search failed: {0}")]
    Search(#[from] SearchError),

    /// A model invocation failed at either pipeline stage.
    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),

    /// The pipeline was driven through an invalid transition.
    #[error("pipeline state error: {0}")]
    State(String),

    /// Report export failed. The in-session textual report is unaffected.
    #[error("report rendering failed: {0}")]
    Render(#[from] RenderError),

    /// The tool sidecar misbehaved (assistant application only).
    #[error("tool invocation failed: {0}")]
    Tool(#[from] McpError),
}
