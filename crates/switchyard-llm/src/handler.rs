//! Axum route handlers for the OpenAI-compatible surface

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use switchyard_core::{ErrorBody, HttpError};

use crate::error::LlmError;
use crate::protocol::openai::{OpenAiModel, OpenAiModelList, OpenAiRequest, OpenAiResponse};
use crate::state::LlmState;
use crate::stream::FrameStream;
use crate::types::CompletionRequest;

/// Build the LLM router with all endpoints
pub fn llm_router(state: LlmState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/models", routing::get(list_models))
        .route("/v1/responses", routing::get(list_responses))
        .route("/v1/responses/{id}", routing::get(get_response))
        .with_state(state)
}

/// Handle `POST /v1/chat/completions`
///
/// The body is taken as raw JSON so malformed requests get an
/// OpenAI-style error and the conversation log sees what was sent.
async fn chat_completions(State(state): State<LlmState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    let raw = match body {
        Ok(Json(raw)) => raw,
        Err(rejection) => {
            let error = LlmError::InvalidRequest(rejection.body_text());
            return error_response(&error);
        }
    };

    let wire_request = match serde_json::from_value::<OpenAiRequest>(raw.clone()) {
        Ok(wire_request) => wire_request,
        Err(e) => return error_response(&LlmError::InvalidRequest(e.to_string())),
    };

    let request = CompletionRequest::from(wire_request);

    // Successful streams are not logged; failures before the first frame are
    if request.stream {
        return match state.complete_stream(request).await {
            Ok(frames) => sse_response(frames).into_response(),
            Err(e) => {
                record_error(&state, raw, &e);
                error_response(&e)
            }
        };
    }

    match state.complete(request).await {
        Ok(response) => {
            let wire_response = OpenAiResponse::from(response);
            let logged = serde_json::to_value(&wire_response).unwrap_or_default();
            state.conversation_log().record(raw, logged);
            Json(wire_response).into_response()
        }
        Err(e) => {
            record_error(&state, raw, &e);
            error_response(&e)
        }
    }
}

fn record_error(state: &LlmState, raw: Value, error: &LlmError) {
    let logged = serde_json::to_value(ErrorBody::from_error(error)).unwrap_or_default();
    state.conversation_log().record(raw, logged);
}

#[derive(Debug, Deserialize)]
struct ModelsQuery {
    provider: Option<String>,
}

/// Handle `GET /v1/models`
async fn list_models(State(state): State<LlmState>, Query(query): Query<ModelsQuery>) -> Response {
    let models = match state.list_models(query.provider.as_deref()).await {
        Ok(models) => models,
        Err(e) => return error_response(&e),
    };

    let data = models
        .into_iter()
        .map(|model| OpenAiModel {
            id: model.id,
            object: "model".to_owned(),
            provider: Some(model.provider),
            owned_by: None,
        })
        .collect();

    Json(OpenAiModelList {
        object: "list".to_owned(),
        data,
    })
    .into_response()
}

/// Handle `GET /v1/responses`
async fn list_responses(State(state): State<LlmState>) -> Response {
    let data: Vec<OpenAiResponse> = state.stored_responses().into_iter().map(Into::into).collect();
    Json(json!({ "object": "list", "data": data })).into_response()
}

/// Handle `GET /v1/responses/{id}`
async fn get_response(State(state): State<LlmState>, Path(id): Path<String>) -> Response {
    match state.stored_response(&id) {
        Ok(response) => Json(OpenAiResponse::from(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Build a streaming SSE response from translated frames
fn sse_response(frames: FrameStream) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let events = frames.map(|frame| {
        let data = frame.to_data().unwrap_or_default();
        Ok(Event::default().data(data))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Convert an LLM error to an `OpenAI`-style JSON error response
fn error_response(error: &LlmError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, status = status.as_u16(), "completion request failed");
    } else {
        tracing::debug!(error = %error, status = status.as_u16(), "completion request rejected");
    }

    (status, Json(ErrorBody::from_error(error))).into_response()
}
