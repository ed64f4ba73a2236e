//! Web-search boundary.
//!
//! The pipeline depends on the [`SearchProvider`] trait; [`TavilyClient`]
//! is the concrete binding to the Tavily Search API. A search failure is
//! fatal for the request it serves; there is no automatic retry.

pub mod tavily;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use tavily::TavilyClient;

/// One search hit: a URL and a content snippet, in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub content: String,
}

/// How thoroughly the provider should search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

/// Per-call search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub depth: SearchDepth,
    pub max_results: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { depth: SearchDepth::Basic, max_results: 5 }
    }
}

/// Errors from the search capability.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request timed out")]
    Timeout,

    #[error("could not reach the search service: {0}")]
    Connection(String),

    #[error("search service rejected the credential")]
    Unauthorized,

    #[error("search service is rate limiting requests")]
    RateLimited,

    #[error("search service returned status {0}")]
    Status(u16),

    /// The response body did not match the expected result shape. Declared
    /// explicitly so an upstream contract change fails loudly instead of
    /// producing an empty result list.
    #[error("search response had an unexpected shape: {0}")]
    Malformed(String),
}

/// Abstract search capability: query string in, ordered results out.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError>;
}
