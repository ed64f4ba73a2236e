//! deskresearch: an LLM-backed research assistant and report generator.
//!
//! The crate's core is a two-stage research pipeline:
//!
//! 1. **Research**: gather evidence (web search results plus text extracted
//!    from uploaded documents), compose a deterministic research prompt, and
//!    ask the model for synthesized findings.
//! 2. **Synthesis**: compose a report prompt from the findings and the
//!    requested report type, and ask the model for the final markdown
//!    report.
//!
//! External capabilities sit behind traits: [`llm::ModelCaller`] for the
//! hosted model, [`search::SearchProvider`] for web search,
//! [`extract::DocumentExtractor`] for PDF text extraction, and the
//! [`mcp`] module for the assistant's tool sidecar. The binaries
//! (`reportgen`, `assistant`) construct the concrete clients once at
//! startup and inject them.

pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod mcp;
pub mod render;
pub mod research;
pub mod search;

pub use chat::{ChatAgent, ChatRole, ChatSession, ChatTurn, ToolInvoker};
pub use config::Config;
pub use error::AgentError;
pub use extract::{DocumentExtractor, ExtractError, PdfTextExtractor};
pub use llm::{CompletionStream, Message, ModelCaller, ModelError, RigCaller, Role, TextChunk};
pub use mcp::{McpClient, McpError, McpToolbox, ToolDescriptor};
pub use render::{RenderError, ReportRenderer};
pub use research::{
    Depth, Evidence, EvidenceGatherer, PipelineState, ReportPipeline, ReportPrompts,
    ResearchRequest, Stage,
};
pub use search::{
    SearchDepth, SearchError, SearchOptions, SearchProvider, SearchResult, TavilyClient,
};
