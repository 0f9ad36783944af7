//! Conversion between internal types and the Ollama native format
//!
//! Ollama has no tool-calling fields, so tools travel as a system prompt
//! and come back as marker JSON in the message content.

use crate::error::LlmError;
use crate::protocol::ollama::{OllamaChatRequest, OllamaChatResponse, OllamaMessage, OllamaOptions};
use crate::simulate;
use crate::stream::ContentAccumulator;
use crate::types::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, FinishReason, Message, Role, StreamDelta,
    StreamEvent, Usage,
};

/// Build the `/api/chat` body for a request
pub fn to_ollama_request(req: &CompletionRequest, stream: bool) -> OllamaChatRequest {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if req.offers_tools()
        && let Some(tools) = &req.tools
    {
        messages.push(OllamaMessage {
            role: Role::System.as_str().to_owned(),
            content: simulate::tool_instructions(tools),
        });
    }

    messages.extend(req.messages.iter().map(to_ollama_message));

    let options = OllamaOptions {
        temperature: req.params.temperature,
        top_p: req.params.top_p,
        num_predict: req.params.max_tokens,
        stop: req.params.stop.clone(),
        frequency_penalty: req.params.frequency_penalty,
        presence_penalty: req.params.presence_penalty,
        seed: req.params.seed,
    };

    OllamaChatRequest {
        model: req.model.clone(),
        messages,
        stream,
        options: (!options.is_empty()).then_some(options),
    }
}

/// Earlier tool turns are replayed as marker text
fn to_ollama_message(msg: &Message) -> OllamaMessage {
    let content = match &msg.tool_calls {
        Some(calls) if !calls.is_empty() => calls
            .iter()
            .map(simulate::render_tool_call)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => msg.text().to_owned(),
    };

    OllamaMessage {
        role: msg.role.as_str().to_owned(),
        content,
    }
}

/// Convert a complete `/api/chat` response
///
/// Marker extraction only runs when the request offered tools. A response
/// without a `message` object has nothing usable and fails the call.
pub fn from_ollama_response(resp: OllamaChatResponse, tools_offered: bool) -> Result<CompletionResponse, LlmError> {
    let usage = usage(&resp);

    let Some(message) = resp.message else {
        return Err(LlmError::Upstream {
            status: None,
            message: "ollama response did not contain a message".to_owned(),
        });
    };

    let tool_call = tools_offered
        .then(|| simulate::extract_tool_call(&message.content))
        .flatten();

    let (message, finish_reason) = match tool_call {
        Some(call) => (
            ChoiceMessage::with_tool_calls(Some(String::new()), vec![call]),
            FinishReason::ToolCalls,
        ),
        None => {
            let reason = resp.done_reason.as_deref().map_or(FinishReason::Stop, FinishReason::from_backend);
            (ChoiceMessage::text(message.content), reason)
        }
    };

    Ok(CompletionResponse {
        id: String::new(),
        object: "chat.completion".to_owned(),
        created: 0,
        model: resp.model,
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: Some(finish_reason),
        }],
        usage,
    })
}

/// Events for one line of a streamed `/api/chat` response
pub fn stream_events(resp: OllamaChatResponse, accumulator: &mut ContentAccumulator) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(message) = &resp.message {
        let delta = accumulator.push(&message.content);
        if !delta.is_empty() {
            events.push(StreamEvent::Delta(StreamDelta::content(delta)));
        }
    }

    if resp.done {
        let reason = resp.done_reason.as_deref().map_or(FinishReason::Stop, FinishReason::from_backend);
        events.push(StreamEvent::Delta(StreamDelta::finish(reason)));
        if let Some(usage) = usage(&resp) {
            events.push(StreamEvent::Usage(usage));
        }
        events.push(StreamEvent::Done);
    }

    events
}

/// Usage is only reported when both counts are known
fn usage(resp: &OllamaChatResponse) -> Option<Usage> {
    Some(Usage::new(resp.prompt_eval_count?, resp.eval_count?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{CompletionParams, ToolCall, ToolChoice, ToolChoiceMode, ToolDefinition};

    fn request(messages: Vec<Message>, tools: Option<Vec<ToolDefinition>>) -> CompletionRequest {
        CompletionRequest {
            model: "llama3".to_owned(),
            messages,
            params: CompletionParams::default(),
            tools,
            tool_choice: None,
            stream: false,
        }
    }

    fn response(content: &str) -> OllamaChatResponse {
        serde_json::from_value(json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": content},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 10,
            "eval_count": 4
        }))
        .unwrap()
    }

    #[test]
    fn max_tokens_becomes_num_predict() {
        let mut req = request(vec![Message::user("hi")], None);
        req.params.max_tokens = Some(64);
        req.params.temperature = Some(0.2);

        let wire = serde_json::to_value(to_ollama_request(&req, false)).unwrap();
        assert_eq!(wire["options"]["num_predict"], 64);
        assert_eq!(wire["options"]["temperature"], 0.2);
        assert_eq!(wire["stream"], false);
        assert!(wire.get("tools").is_none());
    }

    #[test]
    fn tools_become_system_prefix() {
        let tools = vec![ToolDefinition::function("lookup", Some("Search".to_owned()), None)];
        let req = request(vec![Message::user("find x")], Some(tools));

        let wire = to_ollama_request(&req, false);
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "system");
        assert!(wire.messages[0].content.contains("lookup"));
        assert_eq!(wire.messages[1].content, "find x");
    }

    #[test]
    fn tool_choice_none_sends_no_instructions() {
        let tools = vec![ToolDefinition::function("lookup", None, None)];
        let mut req = request(vec![Message::user("find x")], Some(tools));
        req.tool_choice = Some(ToolChoice::Mode(ToolChoiceMode::None));

        assert_eq!(to_ollama_request(&req, false).messages.len(), 1);
    }

    #[test]
    fn prior_tool_turns_are_replayed() {
        let call = ToolCall::new("call_1", "lookup", r#"{"q":"x"}"#);
        let req = request(
            vec![
                Message::user("find x"),
                Message::assistant_tool_calls(None, vec![call]),
                Message::tool_result("call_1", "x is 42"),
            ],
            None,
        );

        let wire = to_ollama_request(&req, false);
        assert_eq!(wire.messages[1].role, "assistant");
        assert!(simulate::extract_tool_call(&wire.messages[1].content).is_some());
        assert_eq!(wire.messages[2].role, "tool");
        assert_eq!(wire.messages[2].content, "x is 42");
    }

    #[test]
    fn plain_reply_finishes_with_stop() {
        let converted = from_ollama_response(response("4"), false).unwrap();

        assert_eq!(converted.first_content(), Some("4"));
        assert_eq!(converted.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(converted.usage, Some(Usage::new(10, 4)));
    }

    #[test]
    fn marker_reply_becomes_tool_call() {
        let converted = from_ollama_response(
            response(r#"{"tool_call":{"name":"lookup","arguments":{"q":"x"}}}"#),
            true,
        )
        .unwrap();

        let choice = &converted.choices[0];
        assert_eq!(choice.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(choice.message.content.as_deref(), Some(""));

        let calls = converted.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "lookup");
        assert_eq!(calls[0].function.arguments, r#"{"q":"x"}"#);
    }

    #[test]
    fn marker_is_ignored_without_tools() {
        let content = r#"{"tool_call":{"name":"lookup","arguments":{}}}"#;
        let converted = from_ollama_response(response(content), false).unwrap();

        assert_eq!(converted.first_content(), Some(content));
        assert!(converted.tool_calls().is_empty());
    }

    #[test]
    fn null_content_degrades_to_empty_text() {
        let body = r#"{"model":"llama3","message":{"role":"assistant","content":null},"done":true}"#;
        let resp: OllamaChatResponse = serde_json::from_str(body).unwrap();

        let response = from_ollama_response(resp, false).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some(""));
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn missing_role_defaults_to_assistant() {
        let body = r#"{"model":"llama3","message":{"content":"hi"},"done":true}"#;
        let resp: OllamaChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.message.as_ref().unwrap().role, "assistant");

        let response = from_ollama_response(resp, false).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("hi"));
    }

    #[test]
    fn null_content_stream_line_still_closes() {
        let line = r#"{"message":{"role":"assistant","content":null},"done":true,"done_reason":"stop"}"#;
        let resp: OllamaChatResponse = serde_json::from_str(line).unwrap();

        let mut acc = ContentAccumulator::default();
        let events = stream_events(resp, &mut acc);
        assert_eq!(events.first(), Some(&StreamEvent::Delta(StreamDelta::finish(FinishReason::Stop))));
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[test]
    fn missing_message_fails() {
        let empty: OllamaChatResponse = serde_json::from_value(json!({"done": true})).unwrap();
        let err = from_ollama_response(empty, false).unwrap_err();
        assert!(matches!(err, LlmError::Upstream { status: None, .. }));
    }

    #[test]
    fn final_stream_line_closes_with_usage() {
        let mut acc = ContentAccumulator::default();
        let events = stream_events(response(""), &mut acc);

        assert_eq!(
            events,
            [
                StreamEvent::Delta(StreamDelta::finish(FinishReason::Stop)),
                StreamEvent::Usage(Usage::new(10, 4)),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn partial_counts_drop_usage() {
        let mut resp = response("ok");
        resp.eval_count = None;
        assert!(from_ollama_response(resp, false).unwrap().usage.is_none());
    }
}
