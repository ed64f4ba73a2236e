//! The staged research pipeline.
//!
//! ```text
//! ResearchRequest
//!       │
//!       ▼
//! EvidenceGatherer ──── search capability + document extraction
//!       │
//!       ▼
//! ReportPrompts ─────── pure, deterministic prompt assembly
//!       │
//!       ▼
//! ReportPipeline ────── stage 1: research findings
//!       │                stage 2: final report
//!       ▼
//! PipelineState (final_report)
//! ```
//!
//! Stage 2 strictly depends on stage 1's textual output; there is no
//! parallelism within a run and no shared state between runs.

pub mod evidence;
pub mod pipeline;
pub mod prompts;

pub use evidence::{Depth, Evidence, EvidenceGatherer, ResearchRequest};
pub use pipeline::{PipelineState, ReportPipeline, Stage};
pub use prompts::{ReportPrompts, REPORT_AUTHOR_ROLE, RESEARCH_ANALYST_ROLE};
