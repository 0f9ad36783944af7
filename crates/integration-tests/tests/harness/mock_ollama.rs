//! Mock Ollama backend for integration tests
//!
//! Serves `/api/tags` and `/api/chat`. Streaming replies are written as
//! newline-delimited JSON, either as incremental pieces or as cumulative
//! snapshots of the content so far.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REPLY: &str = "4";

/// One scripted backend reply
#[derive(Debug, Clone)]
pub enum OllamaReply {
    /// Streamed as word pieces that concatenate to the text
    Text(String),
    /// Streamed frames each carrying the full content so far
    Cumulative(Vec<String>),
}

impl OllamaReply {
    pub fn text(content: &str) -> Self {
        Self::Text(content.to_owned())
    }

    pub fn cumulative(frames: &[&str]) -> Self {
        Self::Cumulative(frames.iter().map(|f| (*f).to_owned()).collect())
    }

    fn full_text(&self) -> String {
        match self {
            Self::Text(content) => content.clone(),
            Self::Cumulative(frames) => frames.last().cloned().unwrap_or_default(),
        }
    }

    fn frames(&self) -> Vec<String> {
        match self {
            Self::Text(content) => content.split_inclusive(' ').map(ToOwned::to_owned).collect(),
            Self::Cumulative(frames) => frames.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaScript {
    pub models: Vec<String>,
    pub replies: Vec<OllamaReply>,
}

impl Default for OllamaScript {
    fn default() -> Self {
        Self {
            models: vec!["llama3".to_owned()],
            replies: Vec::new(),
        }
    }
}

pub struct MockOllama {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    models: Vec<String>,
    replies: Mutex<VecDeque<OllamaReply>>,
    requests: Mutex<Vec<Value>>,
}

impl MockOllama {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(OllamaScript::default()).await
    }

    pub async fn start_with(script: OllamaScript) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            models: script.models,
            replies: Mutex::new(script.replies.into()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/chat", routing::post(handle_chat))
            .route("/api/tags", routing::get(handle_tags))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Chat request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockOllama {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_tags(State(state): State<Arc<MockState>>) -> Json<Value> {
    let models: Vec<Value> = state.models.iter().map(|name| json!({"name": name})).collect();
    Json(json!({"models": models}))
}

async fn handle_chat(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body.clone());

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| OllamaReply::text(DEFAULT_REPLY));

    let model = body["model"].as_str().unwrap_or("mock").to_owned();

    if !body["stream"].as_bool().unwrap_or(true) {
        return Json(json!({
            "model": model,
            "message": {"role": "assistant", "content": reply.full_text()},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 7,
            "eval_count": 3,
        }))
        .into_response();
    }

    let mut lines = String::new();
    for frame in reply.frames() {
        let line = json!({
            "model": model,
            "message": {"role": "assistant", "content": frame},
            "done": false,
        });
        lines.push_str(&line.to_string());
        lines.push('\n');
    }

    let last = json!({
        "model": model,
        "message": {"role": "assistant", "content": ""},
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 7,
        "eval_count": 3,
    });
    lines.push_str(&last.to_string());
    lines.push('\n');

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/x-ndjson")], lines).into_response()
}
