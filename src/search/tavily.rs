//! Tavily Search API binding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchError, SearchOptions, SearchProvider, SearchResult};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the Tavily Search API.
pub struct TavilyClient {
    api_key: String,
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            endpoint: TAVILY_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the API endpoint (tests point this at a local mock server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Request body for the search endpoint.
#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: u32,
    search_depth: String,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    content: String,
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let request = TavilyRequest {
            query: query.to_string(),
            max_results: options.max_results.clamp(1, 20),
            search_depth: options.depth.as_str().to_string(),
            include_answer: false,
            include_raw_content: false,
        };

        debug!(query, depth = options.depth.as_str(), "issuing search request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => SearchError::Unauthorized,
                429 => SearchError::RateLimited,
                code => SearchError::Status(code),
            });
        }

        // A body that decodes but does not carry url/content records is a
        // contract violation, surfaced as Malformed rather than guessed at.
        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| SearchResult { url: r.url, content: r.content })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchDepth;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TavilyClient {
        TavilyClient::new("tvly-test").with_endpoint(format!("{}/search", server.uri()))
    }

    #[tokio::test]
    async fn decodes_results_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({"query": "latest developments"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"url": "https://x", "content": "AI grows", "title": "x", "score": 0.9},
                    {"url": "https://y", "content": "more", "title": "y", "score": 0.5}
                ]
            })))
            .mount(&server)
            .await;

        let results = client_for(&server)
            .search("latest developments", SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], SearchResult {
            url: "https://x".to_string(),
            content: "AI grows".to_string(),
        });
        assert_eq!(results[1].url, "https://y");
    }

    #[tokio::test]
    async fn sends_requested_depth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"search_depth": "advanced", "max_results": 8})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        let options = SearchOptions { depth: SearchDepth::Advanced, max_results: 8 };
        let results = client_for(&server).search("q", options).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search("q", SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Unauthorized));
    }

    #[tokio::test]
    async fn unexpected_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [{"link": "https://x"}]})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search("q", SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Malformed(_)));
    }
}
