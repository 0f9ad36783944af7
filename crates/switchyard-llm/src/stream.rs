//! Streaming translator
//!
//! Turns a provider's [`StreamEvent`] stream into the frames sent to the
//! client: content chunks sharing one id, exactly one terminal chunk with a
//! finish reason, then the `[DONE]` sentinel.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use switchyard_core::ErrorBody;

use crate::convert::openai::ChunkEnvelope;
use crate::error::LlmError;
use crate::format;
use crate::protocol::openai::OpenAiStreamChunk;
use crate::types::{CompletionResponse, FinishReason, StreamDelta, StreamEvent, StreamFunctionCall, StreamToolCall, Usage};

/// Boxed stream of provider events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Boxed stream of client frames
pub type FrameStream = Pin<Box<dyn Stream<Item = StreamFrame> + Send>>;

/// One SSE `data:` payload sent to the client
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Chunk(OpenAiStreamChunk),
    /// Backend failed mid-stream; no sentinel follows
    Error(ErrorBody),
    /// `[DONE]` sentinel
    Done,
}

impl StreamFrame {
    /// Text of the SSE `data:` field
    pub fn to_data(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Chunk(chunk) => serde_json::to_string(chunk),
            Self::Error(body) => serde_json::to_string(body),
            Self::Done => Ok("[DONE]".to_owned()),
        }
    }
}

/// Buffer turning backend content into non-overlapping deltas
///
/// Backends may report either the full text so far or just the new piece.
/// Content that starts with the buffer is cumulative and only its suffix
/// is new, so a repeated snapshot yields nothing. Content that does not
/// extend the buffer is a fragment; from then on the stream is treated as
/// fragments and every piece is appended as-is.
#[derive(Debug, Default)]
pub struct ContentAccumulator {
    buffer: String,
    fragments: bool,
}

impl ContentAccumulator {
    /// Record `content` and return the newly produced text
    pub fn push(&mut self, content: &str) -> String {
        if content.is_empty() {
            return String::new();
        }

        if !self.fragments
            && let Some(delta) = content.strip_prefix(self.buffer.as_str())
        {
            let delta = delta.to_owned();
            content.clone_into(&mut self.buffer);
            return delta;
        }

        self.fragments = true;
        self.buffer.push_str(content);
        content.to_owned()
    }

    /// Everything produced so far
    pub fn content(&self) -> &str {
        &self.buffer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Finished,
    Closed,
}

struct TranslatorState {
    events: EventStream,
    envelope: ChunkEnvelope,
    role_sent: bool,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    phase: Phase,
}

impl TranslatorState {
    fn take_role(&mut self) -> Option<&'static str> {
        (!std::mem::replace(&mut self.role_sent, true)).then_some("assistant")
    }

    fn final_frame(&mut self) -> StreamFrame {
        self.phase = Phase::Finished;
        let role = self.take_role();
        let reason = self.finish_reason.unwrap_or(FinishReason::Stop);
        StreamFrame::Chunk(self.envelope.final_chunk(reason, role, self.usage))
    }
}

/// Translate provider events into client frames
///
/// Finish reasons and usage seen along the way are held back and emitted on
/// the single terminal chunk. A stream that ends without a completion event
/// is still terminated properly.
pub fn translate(events: EventStream, model: String) -> FrameStream {
    let state = TranslatorState {
        events,
        envelope: ChunkEnvelope {
            id: format::completion_id(),
            created: format::unix_now(),
            model,
        },
        role_sent: false,
        finish_reason: None,
        usage: None,
        phase: Phase::Streaming,
    };

    let frames = futures_util::stream::unfold(state, |mut st| async move {
        loop {
            match st.phase {
                Phase::Closed => return None,
                Phase::Finished => {
                    st.phase = Phase::Closed;
                    return Some((StreamFrame::Done, st));
                }
                Phase::Streaming => {}
            }

            match st.events.next().await {
                Some(Ok(StreamEvent::Delta(delta))) => {
                    if let Some(reason) = delta.finish_reason {
                        st.finish_reason = Some(reason);
                    }
                    if delta.has_payload() {
                        let role = st.take_role();
                        let chunk = st.envelope.delta_chunk(&delta, role);
                        return Some((StreamFrame::Chunk(chunk), st));
                    }
                }
                Some(Ok(StreamEvent::Usage(usage))) => st.usage = Some(usage),
                Some(Ok(StreamEvent::Done)) | None => {
                    let frame = st.final_frame();
                    return Some((frame, st));
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, model = %st.envelope.model, "stream aborted by backend error");
                    st.phase = Phase::Closed;
                    return Some((StreamFrame::Error(ErrorBody::from_error(&e)), st));
                }
            }
        }
    });

    Box::pin(frames)
}

/// Replay a finished response as provider events
///
/// Used when a backend can only answer a request in one piece.
pub fn replay(response: &CompletionResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let mut finish_reason = None;

    for choice in &response.choices {
        if let Some(content) = choice.message.content.as_deref().filter(|c| !c.is_empty()) {
            events.push(StreamEvent::Delta(StreamDelta {
                index: choice.index,
                ..StreamDelta::content(content)
            }));
        }

        for (position, call) in choice.message.tool_calls.iter().flatten().enumerate() {
            events.push(StreamEvent::Delta(StreamDelta {
                index: choice.index,
                tool_call: Some(StreamToolCall {
                    index: u32::try_from(position).unwrap_or(u32::MAX),
                    id: Some(call.id.clone()),
                    function: Some(StreamFunctionCall {
                        name: Some(call.function.name.clone()),
                        arguments: Some(call.function.arguments.clone()),
                    }),
                }),
                ..StreamDelta::default()
            }));
        }

        finish_reason = finish_reason.or(choice.finish_reason);
    }

    events.push(StreamEvent::Delta(StreamDelta::finish(
        finish_reason.unwrap_or(FinishReason::Stop),
    )));
    if let Some(usage) = response.usage {
        events.push(StreamEvent::Usage(usage));
    }
    events.push(StreamEvent::Done);
    events
}
