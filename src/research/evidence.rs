//! Research requests and evidence gathering.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extract::DocumentExtractor;
use crate::search::{SearchDepth, SearchError, SearchOptions, SearchProvider, SearchResult};

/// How thorough a research run should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Depth {
    Basic,
    #[default]
    Detailed,
    Comprehensive,
}

impl Depth {
    /// Search parameters for this depth.
    fn search_options(self) -> SearchOptions {
        match self {
            Depth::Basic => SearchOptions { depth: SearchDepth::Basic, max_results: 5 },
            Depth::Detailed => SearchOptions { depth: SearchDepth::Advanced, max_results: 5 },
            Depth::Comprehensive => SearchOptions { depth: SearchDepth::Advanced, max_results: 8 },
        }
    }
}

/// One research job, immutable once submitted.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub topic: String,
    pub question: String,
    pub depth: Depth,
    pub report_type: String,
    /// Raw bytes of any uploaded documents, in upload order.
    pub documents: Vec<Vec<u8>>,
}

impl ResearchRequest {
    /// The query string sent to the search capability.
    pub fn query(&self) -> String {
        format!("{}: {}", self.topic, self.question)
    }
}

/// Aggregated external material for one request. Built once, read-only
/// afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Search hits in provider order.
    pub search_results: Vec<SearchResult>,
    /// Extracted text, one entry per supplied document; an empty string
    /// marks a document whose extraction failed.
    pub document_text: Vec<String>,
}

/// Collects raw material for a research request: one search call plus text
/// extraction for every uploaded document.
pub struct EvidenceGatherer {
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn DocumentExtractor>,
}

impl EvidenceGatherer {
    pub fn new(search: Arc<dyn SearchProvider>, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { search, extractor }
    }

    /// Gather evidence for a request. Performs fresh I/O on every call:
    /// no caching, no deduplication.
    ///
    /// A failed extraction downgrades that document to an empty string and
    /// gathering continues; a failed search fails the whole request.
    pub async fn gather(&self, request: &ResearchRequest) -> Result<Evidence, SearchError> {
        let document_text: Vec<String> = request
            .documents
            .iter()
            .enumerate()
            .map(|(index, bytes)| match self.extractor.extract(bytes) {
                Ok(text) => text,
                Err(err) => {
                    warn!(index, %err, "document extraction failed, continuing without it");
                    String::new()
                }
            })
            .collect();

        let query = request.query();
        debug!(%query, "gathering search evidence");
        let search_results = self
            .search
            .search(&query, request.depth.search_options())
            .await?;

        info!(
            results = search_results.len(),
            documents = document_text.len(),
            "evidence gathered"
        );

        Ok(Evidence { search_results, document_text })
    }
}
