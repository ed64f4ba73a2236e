//! End-to-end pipeline tests with scripted collaborators.
//!
//! These drive the full research → synthesis flow through the public API,
//! checking the evidence/prompt/state contract without any network I/O.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use deskresearch::{
    AgentError, CompletionStream, Depth, DocumentExtractor, ExtractError, Message, ModelCaller,
    ModelError, ReportPipeline, ResearchRequest, Role, SearchError, SearchOptions,
    SearchProvider, SearchResult, Stage, TextChunk,
};

/// Model caller that replays scripted responses and records every
/// invocation it receives.
struct ScriptedCaller {
    responses: Mutex<Vec<String>>,
    invocations: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
}

impl ScriptedCaller {
    fn new(responses: &[&str]) -> Arc<Self> {
        let mut responses: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
        responses.reverse();
        Arc::new(Self {
            responses: Mutex::new(responses),
            invocations: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn invocation(&self, index: usize) -> Vec<Message> {
        self.invocations.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelCaller for ScriptedCaller {
    async fn complete(&self, messages: &[Message]) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ModelError::Provider("model unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct FixedSearch(Vec<SearchResult>);

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(
        &self,
        _query: &str,
        _options: SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        Ok(self.0.clone())
    }
}

struct FailingSearch;

#[async_trait]
impl SearchProvider for FailingSearch {
    async fn search(
        &self,
        _query: &str,
        _options: SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        Err(SearchError::Status(503))
    }
}

/// Extractor scripted per document index.
struct ScriptedExtractor {
    outcomes: Vec<Result<String, ()>>,
    seen: AtomicUsize,
}

impl ScriptedExtractor {
    fn new(outcomes: Vec<Result<String, ()>>) -> Self {
        Self { outcomes, seen: AtomicUsize::new(0) }
    }
}

impl DocumentExtractor for ScriptedExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
        let index = self.seen.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.get(index) {
            Some(Ok(text)) => Ok(text.clone()),
            _ => Err(ExtractError::Parse("unreadable document".to_string())),
        }
    }
}

fn market_analysis_request(documents: Vec<Vec<u8>>) -> ResearchRequest {
    ResearchRequest {
        topic: "Artificial Intelligence".to_string(),
        question: "latest developments".to_string(),
        depth: Depth::Detailed,
        report_type: "Market Analysis".to_string(),
        documents,
    }
}

fn single_result_search() -> Arc<FixedSearch> {
    Arc::new(FixedSearch(vec![SearchResult {
        url: "https://x".to_string(),
        content: "AI grows".to_string(),
    }]))
}

#[tokio::test]
async fn market_analysis_scenario_flows_through_both_stages() {
    let caller = ScriptedCaller::new(&["the findings", "the report"]);
    let pipeline = ReportPipeline::new(
        caller.clone(),
        single_result_search(),
        Arc::new(ScriptedExtractor::new(vec![])),
    );

    let state = pipeline
        .run(market_analysis_request(vec![]))
        .await
        .unwrap();

    assert_eq!(state.stage(), Stage::Done);
    assert_eq!(state.research_findings(), Some("the findings"));
    assert_eq!(state.final_report(), Some("the report"));
    assert_eq!(caller.call_count(), 2);

    // Stage 1: analyst system instruction plus the composed research prompt.
    let research_call = caller.invocation(0);
    assert_eq!(research_call[0].role, Role::System);
    assert!(research_call[0].content.contains("research analyst"));
    assert!(research_call[1].content.contains("URL: https://x"));
    assert!(research_call[1].content.contains("Content: AI grows"));

    // Stage 2: consultant system instruction, the findings, the literal
    // report type.
    let report_call = caller.invocation(1);
    assert!(report_call[0].content.contains("senior consultant"));
    assert!(report_call[1].content.contains("the findings"));
    assert!(report_call[1].content.contains("Report Type: Market Analysis"));
}

#[tokio::test]
async fn search_failure_never_reaches_the_model() {
    let caller = ScriptedCaller::new(&["should never be used"]);
    let pipeline = ReportPipeline::new(
        caller.clone(),
        Arc::new(FailingSearch),
        Arc::new(ScriptedExtractor::new(vec![])),
    );

    let result = pipeline.run(market_analysis_request(vec![])).await;

    assert!(matches!(result, Err(AgentError::Search(_))));
    assert_eq!(caller.call_count(), 0);
}

#[tokio::test]
async fn stage_one_model_failure_aborts_before_stage_two() {
    // Script is empty: the first completion call fails.
    let caller = ScriptedCaller::new(&[]);
    let pipeline = ReportPipeline::new(
        caller.clone(),
        single_result_search(),
        Arc::new(ScriptedExtractor::new(vec![])),
    );

    let result = pipeline.run(market_analysis_request(vec![])).await;

    assert!(matches!(result, Err(AgentError::Model(_))));
    assert_eq!(caller.call_count(), 1);
}

#[tokio::test]
async fn failed_extraction_keeps_its_slot_and_the_run_succeeds() {
    let caller = ScriptedCaller::new(&["findings", "report"]);
    let pipeline = ReportPipeline::new(
        caller.clone(),
        single_result_search(),
        Arc::new(ScriptedExtractor::new(vec![Ok("Hello".to_string()), Err(())])),
    );

    let state = pipeline
        .run(market_analysis_request(vec![b"doc-a".to_vec(), b"doc-b".to_vec()]))
        .await
        .unwrap();

    let evidence = state.evidence().unwrap();
    assert_eq!(evidence.document_text, vec!["Hello".to_string(), String::new()]);

    // The surviving document made it into the research prompt; the failed
    // one contributed nothing.
    let research_prompt = &caller.invocation(0)[1].content;
    assert!(research_prompt.contains("Hello"));
}

#[tokio::test]
async fn documents_only_evidence_produces_no_url_lines() {
    let caller = ScriptedCaller::new(&["findings", "report"]);
    let pipeline = ReportPipeline::new(
        caller.clone(),
        Arc::new(FixedSearch(vec![])),
        Arc::new(ScriptedExtractor::new(vec![Ok("Quarterly revenue grew".to_string())])),
    );

    pipeline
        .run(market_analysis_request(vec![b"doc".to_vec()]))
        .await
        .unwrap();

    let research_prompt = &caller.invocation(0)[1].content;
    assert!(research_prompt.contains("Quarterly revenue grew"));
    assert!(!research_prompt.contains("URL:"));
}

/// Caller with a scripted multi-chunk stream, for the streaming contract.
struct StreamingCaller {
    chunks: Vec<&'static str>,
}

#[async_trait]
impl ModelCaller for StreamingCaller {
    async fn complete(&self, _messages: &[Message]) -> Result<String, ModelError> {
        Ok(self.chunks.concat())
    }

    async fn stream(&self, _messages: &[Message]) -> Result<CompletionStream, ModelError> {
        let chunks: Vec<Result<TextChunk, ModelError>> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, content)| {
                Ok(TextChunk {
                    content: content.to_string(),
                    is_final: i + 1 == self.chunks.len(),
                })
            })
            .collect();
        Ok(CompletionStream::new(futures::stream::iter(chunks)))
    }

    fn name(&self) -> &str {
        "streaming"
    }
}

#[tokio::test]
async fn streamed_chunks_reconstruct_the_full_text_in_order() {
    let caller = StreamingCaller { chunks: vec!["The", " sky", " is blue"] };
    let messages = [Message::user("describe the sky")];

    let full = caller
        .stream(&messages)
        .await
        .unwrap()
        .collect_text()
        .await
        .unwrap();
    assert_eq!(full, "The sky is blue");

    // Abandoning the stream after two chunks observes a strict prefix.
    let mut stream = caller.stream(&messages).await.unwrap();
    let mut partial = String::new();
    for _ in 0..2 {
        partial.push_str(&stream.next().await.unwrap().unwrap().content);
    }
    drop(stream);

    assert_eq!(partial, "The sky");
    assert!(full.starts_with(&partial));
}
