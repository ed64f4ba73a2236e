//! Report generator application.
//!
//! A single-process web app: a research request goes in (topic, question,
//! depth, report type, optional uploaded documents), the two-stage pipeline
//! runs, and the markdown report comes back. The most recent report can be
//! exported as a PDF.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rig::client::{CompletionClient, ProviderClient};
use rig::providers::gemini;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use deskresearch::{
    Config, Depth, DocumentExtractor, ModelCaller, PdfTextExtractor, ReportPipeline,
    ReportRenderer, ResearchRequest, RigCaller, SearchProvider, TavilyClient,
};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<ReportPipeline>,
    renderer: Arc<ReportRenderer>,
    last_report: Arc<RwLock<Option<String>>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskresearch=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let search_key = config.search_api_key()?.to_string();

    // All long-lived clients are built here, once, and injected below.
    let client = gemini::Client::from_env();
    let agent = client.agent(&config.model).build();
    let model: Arc<dyn ModelCaller> = Arc::new(RigCaller::new(agent, &config.model));
    let search: Arc<dyn SearchProvider> = Arc::new(TavilyClient::new(search_key));
    let extractor: Arc<dyn DocumentExtractor> = Arc::new(PdfTextExtractor);

    let state = AppState {
        pipeline: Arc::new(ReportPipeline::new(model, search, extractor)),
        renderer: Arc::new(ReportRenderer::new()),
        last_report: Arc::new(RwLock::new(None)),
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/report", post(generate_report))
        .route("/report/pdf", get(export_report))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.bind_addr_or("127.0.0.1:8080");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, model = %config.model, "report generator listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct ReportRequestBody {
    topic: String,
    question: String,
    #[serde(default)]
    depth: Depth,
    report_type: String,
    /// Uploaded documents, base64-encoded, in upload order.
    #[serde(default)]
    documents: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReportResponseBody {
    report: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message.into() }))
}

fn failure(message: impl Into<String>) -> ApiError {
    let message = message.into();
    error!(%message, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: message }))
}

async fn generate_report(
    State(state): State<AppState>,
    Json(body): Json<ReportRequestBody>,
) -> Result<Json<ReportResponseBody>, ApiError> {
    let documents: Vec<Vec<u8>> = body
        .documents
        .iter()
        .map(|encoded| BASE64.decode(encoded))
        .collect::<Result<_, _>>()
        .map_err(|_| bad_request("documents must be base64-encoded"))?;

    let request = ResearchRequest {
        topic: body.topic,
        question: body.question,
        depth: body.depth,
        report_type: body.report_type,
        documents,
    };

    let outcome = state
        .pipeline
        .run(request)
        .await
        .map_err(|e| failure(e.to_string()))?;
    let report = outcome
        .final_report()
        .ok_or_else(|| failure("the pipeline finished without a report"))?
        .to_string();

    *state.last_report.write().await = Some(report.clone());
    Ok(Json(ReportResponseBody { report }))
}

async fn export_report(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.last_report.read().await.clone().ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorBody { error: "no report has been generated yet".to_string() }),
    ))?;

    // Rendering is CPU-bound; keep it off the async workers. A failure here
    // only fails the export, the textual report stays available.
    let renderer = state.renderer.clone();
    let path = tokio::task::spawn_blocking(move || renderer.export(&report))
        .await
        .map_err(|e| failure(e.to_string()))?
        .map_err(|e| failure(e.to_string()))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| failure(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"research_report.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Research Report Generator</title></head>
<body>
<h1>Research Report Generator</h1>
<form id="f">
  <label>Topic <input name="topic" required></label><br>
  <label>Question <input name="question" required></label><br>
  <label>Depth
    <select name="depth">
      <option>Basic</option><option selected>Detailed</option><option>Comprehensive</option>
    </select>
  </label><br>
  <label>Report type <input name="report_type" value="Market Analysis"></label><br>
  <button>Generate</button>
</form>
<pre id="out"></pre>
<a href="/report/pdf">Download last report as PDF</a>
<script>
document.getElementById('f').addEventListener('submit', async (e) => {
  e.preventDefault();
  const data = Object.fromEntries(new FormData(e.target));
  document.getElementById('out').textContent = 'Working…';
  const res = await fetch('/report', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify(data),
  });
  const body = await res.json();
  document.getElementById('out').textContent = res.ok ? body.report : body.error;
});
</script>
</body>
</html>
"#;
