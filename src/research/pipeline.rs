//! The two-stage report pipeline.
//!
//! Stage 1 (research) gathers evidence and asks the model to synthesize
//! findings; stage 2 (synthesis) turns those findings into the final
//! report. Stages are strictly ordered, each writes exactly one field of
//! [`PipelineState`], and a failure at either stage aborts the run with no
//! partial result.

use std::sync::Arc;

use tracing::{info, instrument};

use super::evidence::{Evidence, EvidenceGatherer, ResearchRequest};
use super::prompts::{ReportPrompts, REPORT_AUTHOR_ROLE, RESEARCH_ANALYST_ROLE};
use crate::error::AgentError;
use crate::extract::DocumentExtractor;
use crate::llm::{Message, ModelCaller};
use crate::search::SearchProvider;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Researching,
    Synthesizing,
    Done,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done)
    }
}

/// State threaded through one pipeline run.
///
/// Each field has exactly one writer and is written once: the gatherer sets
/// `evidence`, stage 1 sets `research_findings`, stage 2 sets
/// `final_report`. Transitions are validated: recording a report on a
/// state without findings is an error, not a silent overwrite.
#[derive(Debug)]
pub struct PipelineState {
    request: ResearchRequest,
    stage: Stage,
    evidence: Option<Evidence>,
    research_findings: Option<String>,
    final_report: Option<String>,
}

impl PipelineState {
    pub fn new(request: ResearchRequest) -> Self {
        Self {
            request,
            stage: Stage::Researching,
            evidence: None,
            research_findings: None,
            final_report: None,
        }
    }

    pub fn request(&self) -> &ResearchRequest {
        &self.request
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn evidence(&self) -> Option<&Evidence> {
        self.evidence.as_ref()
    }

    pub fn research_findings(&self) -> Option<&str> {
        self.research_findings.as_deref()
    }

    /// The terminal value of a successful run.
    pub fn final_report(&self) -> Option<&str> {
        self.final_report.as_deref()
    }

    pub fn record_evidence(&mut self, evidence: Evidence) -> Result<(), AgentError> {
        if self.stage != Stage::Researching || self.evidence.is_some() {
            return Err(AgentError::State(
                "evidence can only be recorded once, during the research stage".to_string(),
            ));
        }
        self.evidence = Some(evidence);
        Ok(())
    }

    pub fn record_findings(&mut self, findings: String) -> Result<(), AgentError> {
        if self.stage != Stage::Researching {
            return Err(AgentError::State(
                "research findings can only be recorded during the research stage".to_string(),
            ));
        }
        if self.evidence.is_none() {
            return Err(AgentError::State(
                "research findings require gathered evidence".to_string(),
            ));
        }
        self.research_findings = Some(findings);
        self.stage = Stage::Synthesizing;
        Ok(())
    }

    pub fn record_report(&mut self, report: String) -> Result<(), AgentError> {
        if self.research_findings.is_none() {
            return Err(AgentError::State(
                "the report stage requires research findings".to_string(),
            ));
        }
        if self.stage != Stage::Synthesizing {
            return Err(AgentError::State(
                "the final report can only be recorded during the synthesis stage".to_string(),
            ));
        }
        self.final_report = Some(report);
        self.stage = Stage::Done;
        Ok(())
    }
}

/// Executes the two-stage pipeline for one request at a time.
///
/// Collaborators are injected once at construction; every run owns its own
/// [`PipelineState`] and shares nothing with concurrent runs.
pub struct ReportPipeline {
    gatherer: EvidenceGatherer,
    model: Arc<dyn ModelCaller>,
}

impl ReportPipeline {
    pub fn new(
        model: Arc<dyn ModelCaller>,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        Self { gatherer: EvidenceGatherer::new(search, extractor), model }
    }

    /// Run both stages for a single request.
    ///
    /// Returns the terminal state with `final_report` set, or the first
    /// error encountered; no partial result is ever returned.
    #[instrument(skip(self, request), fields(topic = %request.topic))]
    pub async fn run(&self, request: ResearchRequest) -> Result<PipelineState, AgentError> {
        let mut state = PipelineState::new(request);

        info!("research stage started");
        let evidence = self.gatherer.gather(state.request()).await?;
        let research_prompt = ReportPrompts::research_prompt(&evidence);
        state.record_evidence(evidence)?;

        let findings = self
            .model
            .complete(&[
                Message::system(RESEARCH_ANALYST_ROLE),
                Message::user(research_prompt),
            ])
            .await?;
        info!(chars = findings.len(), "research findings produced");

        let report_prompt =
            ReportPrompts::report_prompt(&findings, &state.request().report_type);
        state.record_findings(findings)?;

        info!("synthesis stage started");
        let report = self
            .model
            .complete(&[
                Message::system(REPORT_AUTHOR_ROLE),
                Message::user(report_prompt),
            ])
            .await?;
        info!(chars = report.len(), "final report produced");
        state.record_report(report)?;

        Ok(state)
    }
}
