//! Chat assistant application.
//!
//! A single-process web app: each browser session gets an append-only chat
//! history; user prompts are answered by the hosted model, augmented with
//! tools served by an optional sidecar process. Replies stream to the
//! client as server-sent events; a failed turn is discarded and the prior
//! history stays intact.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use rig::client::{CompletionClient, ProviderClient};
use rig::providers::gemini;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use deskresearch::chat::ToolInvoker;
use deskresearch::{ChatAgent, ChatSession, ChatTurn, Config, McpToolbox, ModelCaller, RigCaller};

#[derive(Clone)]
struct AppState {
    agent: Arc<ChatAgent>,
    sessions: Arc<dashmap::DashMap<Uuid, ChatSession>>,
    toolbox: Option<Arc<Mutex<McpToolbox>>>,
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

    let client = gemini::Client::from_env();
    let agent = client.agent(&config.model).build();
    let model: Arc<dyn ModelCaller> = Arc::new(RigCaller::new(agent, &config.model));

    // The sidecar is optional: without it the assistant simply has no tools.
    let toolbox = match &config.mcp_command {
        Some(command) => {
            match McpToolbox::connect(command, &config.mcp_args, &HashMap::new()).await {
                Ok(toolbox) => Some(Arc::new(Mutex::new(toolbox))),
                Err(err) => {
                    warn!(%err, "tool sidecar unavailable, continuing without tools");
                    None
                }
            }
        }
        None => None,
    };

    let state = AppState {
        agent: Arc::new(ChatAgent::new(model)),
        sessions: Arc::new(dashmap::DashMap::new()),
        toolbox,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(session_history))
        .route("/sessions/:id/messages", post(post_message))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.bind_addr_or("127.0.0.1:8081");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, model = %config.model, "assistant listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: Uuid,
}

#[derive(Debug, Serialize)]
struct SessionHistory {
    turns: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    content: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody { error: "unknown session".to_string() }),
    )
}

async fn create_session(State(state): State<AppState>) -> Json<SessionCreated> {
    let session_id = Uuid::new_v4();
    state.sessions.insert(session_id, ChatSession::new());
    info!(%session_id, "chat session created");
    Json(SessionCreated { session_id })
}

async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionHistory>, ApiError> {
    let session = state.sessions.get(&session_id).ok_or_else(not_found)?;
    Ok(Json(SessionHistory { turns: session.turns().to_vec() }))
}

/// Accumulates the streamed reply so the turn can be committed (or
/// discarded) when the stream ends.
#[derive(Default)]
struct TurnBuffer {
    text: String,
    failed: bool,
}

async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let history = state
        .sessions
        .get(&session_id)
        .map(|session| session.value().clone())
        .ok_or_else(not_found)?;
    let prompt = body.content;

    // Tool rounds run to completion here; only the final answer streams out.
    let reply = match &state.toolbox {
        Some(toolbox) => {
            let mut guard = toolbox.lock().await;
            state
                .agent
                .respond(&history, &prompt, Some(&mut *guard as &mut dyn ToolInvoker))
                .await
        }
        None => state.agent.respond(&history, &prompt, None).await,
    }
    .map_err(|err| {
        error!(%session_id, %err, "chat turn failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: err.to_string() }),
        )
    })?;

    let buffer = Arc::new(StdMutex::new(TurnBuffer::default()));

    let tokens = {
        let buffer = buffer.clone();
        reply.map(move |chunk| {
            let mut buffer = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let event = match chunk {
                Ok(chunk) => {
                    buffer.text.push_str(&chunk.content);
                    Event::default().event("token").data(chunk.content)
                }
                Err(err) => {
                    buffer.failed = true;
                    Event::default().event("error").data(err.to_string())
                }
            };
            Ok::<Event, Infallible>(event)
        })
    };

    // Commit the exchange only after the whole reply arrived; an errored or
    // abandoned stream leaves the session exactly as it was.
    let commit = {
        let sessions = state.sessions.clone();
        futures::stream::once(async move {
            let committed = {
                let buffer = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                (!buffer.failed).then(|| buffer.text.clone())
            };
            if let Some(text) = committed {
                if let Some(mut session) = sessions.get_mut(&session_id) {
                    session.commit_turn(prompt, text);
                }
            }
            Ok::<Event, Infallible>(Event::default().event("done").data(""))
        })
    };

    Ok(Sse::new(tokens.chain(commit)).keep_alive(KeepAlive::default()))
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Research Assistant</title></head>
<body>
<h1>Research Assistant</h1>
<div id="log" style="white-space: pre-wrap"></div>
<form id="f">
  <input id="msg" size="60" placeholder="Ask me anything..." required>
  <button>Send</button>
</form>
<script>
let sessionId = null;
async function ensureSession() {
  if (!sessionId) {
    const res = await fetch('/sessions', {method: 'POST'});
    sessionId = (await res.json()).session_id;
  }
  return sessionId;
}
document.getElementById('f').addEventListener('submit', async (e) => {
  e.preventDefault();
  const content = document.getElementById('msg').value;
  document.getElementById('msg').value = '';
  const log = document.getElementById('log');
  log.textContent += '\nYou: ' + content + '\nAssistant: ';
  const id = await ensureSession();
  const res = await fetch(`/sessions/${id}/messages`, {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({content}),
  });
  const reader = res.body.getReader();
  const decoder = new TextDecoder();
  let buf = '';
  for (;;) {
    const {done, value} = await reader.read();
    if (done) break;
    buf += decoder.decode(value, {stream: true});
    for (const line of buf.split('\n\n').slice(0, -1)) {
      const data = line.split('\n').filter(l => l.startsWith('data: '))
        .map(l => l.slice(6)).join('\n');
      if (line.includes('event: token')) log.textContent += data;
      if (line.includes('event: error')) log.textContent += '[error] ' + data;
    }
    buf = buf.split('\n\n').slice(-1)[0];
  }
});
</script>
</body>
</html>
"#;
