//! Mock OpenAI-compatible backend for integration tests
//!
//! Replies are scripted in order; once the script runs out every request
//! gets the default text reply. Every chat request body is recorded.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REPLY: &str = "Hello from mock OpenAI";

/// One scripted backend reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// A single tool call with JSON-encoded arguments
    ToolCall { name: String, arguments: String },
    /// Error response with the given status
    Status(u16),
}

impl Reply {
    pub fn text(content: &str) -> Self {
        Self::Text(content.to_owned())
    }

    pub fn tool_call(name: &str, arguments: &Value) -> Self {
        Self::ToolCall {
            name: name.to_owned(),
            arguments: arguments.to_string(),
        }
    }
}

/// Mock backend configuration
#[derive(Debug, Clone)]
pub struct OpenAiScript {
    pub models: Vec<String>,
    pub replies: Vec<Reply>,
    /// Answer `GET /v1/models` with 503
    pub fail_listing: bool,
}

impl Default for OpenAiScript {
    fn default() -> Self {
        Self {
            models: vec!["gpt-4o".to_owned()],
            replies: Vec::new(),
            fail_listing: false,
        }
    }
}

pub struct MockOpenAi {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    models: Vec<String>,
    fail_listing: bool,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Value>>,
}

impl MockOpenAi {
    /// Start with the default script
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(OpenAiScript::default()).await
    }

    pub async fn start_with(script: OpenAiScript) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            models: script.models,
            fail_listing: script.fail_listing,
            replies: Mutex::new(script.replies.into()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .route("/v1/models", routing::get(handle_models))
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

    /// Base URL including `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Chat request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn completion_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

impl Drop for MockOpenAi {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_models(State(state): State<Arc<MockState>>) -> Response {
    if state.fail_listing {
        return (StatusCode::SERVICE_UNAVAILABLE, "listing unavailable").into_response();
    }

    let data: Vec<Value> = state
        .models
        .iter()
        .map(|id| json!({"id": id, "object": "model", "created": 1_700_000_000, "owned_by": "mock"}))
        .collect();

    Json(json!({"object": "list", "data": data})).into_response()
}

async fn handle_chat_completions(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body.clone());

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::text(DEFAULT_REPLY));

    let model = body["model"].as_str().unwrap_or("mock").to_owned();
    let stream = body["stream"].as_bool().unwrap_or(false);

    match reply {
        Reply::Status(status) => {
            let status = StatusCode::from_u16(status).unwrap();
            let error = json!({"error": {"message": "mock backend failure", "type": "server_error"}});
            (status, Json(error)).into_response()
        }
        reply if stream => stream_reply(&model, &reply),
        reply => Json(completion(&model, &reply)).into_response(),
    }
}

fn completion(model: &str, reply: &Reply) -> Value {
    let (message, finish_reason) = match reply {
        Reply::ToolCall { name, arguments } => (
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_mock_1",
                    "type": "function",
                    "function": {"name": name, "arguments": arguments},
                }],
            }),
            "tool_calls",
        ),
        Reply::Text(content) => (json!({"role": "assistant", "content": content}), "stop"),
        Reply::Status(_) => unreachable!("status replies are not completions"),
    };

    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
    })
}

fn chunk(model: &str, delta: &Value, finish_reason: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}],
    })
}

/// SSE body splitting text on word boundaries so the pieces concatenate
/// back to the full reply
fn stream_reply(model: &str, reply: &Reply) -> Response {
    let mut chunks = vec![chunk(model, &json!({"role": "assistant", "content": ""}), None)];

    let finish_reason = match reply {
        Reply::Text(content) => {
            for piece in content.split_inclusive(' ') {
                chunks.push(chunk(model, &json!({"content": piece}), None));
            }
            "stop"
        }
        Reply::ToolCall { name, arguments } => {
            chunks.push(chunk(
                model,
                &json!({"tool_calls": [{
                    "index": 0,
                    "id": "call_mock_1",
                    "type": "function",
                    "function": {"name": name, "arguments": ""},
                }]}),
                None,
            ));
            chunks.push(chunk(
                model,
                &json!({"tool_calls": [{"index": 0, "function": {"arguments": arguments}}]}),
                None,
            ));
            "tool_calls"
        }
        Reply::Status(_) => unreachable!("status replies are not streamed"),
    };

    chunks.push(chunk(model, &json!({}), Some(finish_reason)));

    let mut body = String::new();
    for chunk in chunks {
        let _ = write!(body, "data: {chunk}\n\n");
    }
    body.push_str("data: [DONE]\n\n");

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
