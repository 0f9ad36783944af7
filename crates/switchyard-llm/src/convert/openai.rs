//! Conversion between internal types and the `OpenAI` wire format

use crate::protocol::openai::{
    OpenAiChoice, OpenAiChoiceMessage, OpenAiContent, OpenAiFunction, OpenAiFunctionCall, OpenAiMessage,
    OpenAiRequest, OpenAiResponse, OpenAiStreamChoice, OpenAiStreamChunk, OpenAiStreamDelta, OpenAiStreamFunctionCall,
    OpenAiStreamOptions, OpenAiStreamToolCall, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
use crate::types::{
    Choice, ChoiceMessage, CompletionParams, CompletionRequest, CompletionResponse, FinishReason, FunctionDefinition,
    Message, Role, StreamDelta, StreamEvent, StreamFunctionCall, StreamToolCall, ToolCall, ToolChoice,
    ToolChoiceFunction, ToolChoiceMode, ToolDefinition, Usage,
};

// -- Inbound: client wire format -> internal types --

impl From<OpenAiRequest> for CompletionRequest {
    fn from(req: OpenAiRequest) -> Self {
        Self {
            model: req.model,
            messages: req.messages.into_iter().map(Into::into).collect(),
            params: CompletionParams {
                temperature: req.temperature,
                top_p: req.top_p,
                max_tokens: req.max_tokens,
                stop: req.stop,
                frequency_penalty: req.frequency_penalty,
                presence_penalty: req.presence_penalty,
                seed: req.seed,
            },
            tools: req.tools.map(|tools| tools.into_iter().map(Into::into).collect()),
            tool_choice: req.tool_choice.as_ref().and_then(parse_tool_choice),
            stream: req.stream.unwrap_or(false),
        }
    }
}

impl From<OpenAiMessage> for Message {
    fn from(msg: OpenAiMessage) -> Self {
        let role = match msg.role.as_str() {
            "system" | "developer" => Role::System,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::User,
        };

        Self {
            role,
            content: msg.content.map(OpenAiContent::into_text),
            name: msg.name,
            tool_calls: msg
                .tool_calls
                .map(|calls| calls.into_iter().map(Into::into).collect()),
            tool_call_id: msg.tool_call_id,
        }
    }
}

impl From<OpenAiToolCall> for ToolCall {
    fn from(call: OpenAiToolCall) -> Self {
        Self::new(call.id, call.function.name, call.function.arguments)
    }
}

impl From<OpenAiTool> for ToolDefinition {
    fn from(tool: OpenAiTool) -> Self {
        Self {
            tool_type: tool.tool_type,
            function: FunctionDefinition {
                name: tool.function.name,
                description: tool.function.description,
                parameters: tool.function.parameters,
            },
        }
    }
}

/// Parse the flexible `tool_choice` field; unrecognized values are ignored
fn parse_tool_choice(value: &serde_json::Value) -> Option<ToolChoice> {
    match value {
        serde_json::Value::String(s) => match s.as_str() {
            "none" => Some(ToolChoice::Mode(ToolChoiceMode::None)),
            "auto" => Some(ToolChoice::Mode(ToolChoiceMode::Auto)),
            "required" => Some(ToolChoice::Mode(ToolChoiceMode::Required)),
            _ => None,
        },
        serde_json::Value::Object(_) => serde_json::from_value::<ToolChoiceFunction>(value.clone())
            .ok()
            .map(ToolChoice::Function),
        _ => None,
    }
}

// -- Outbound: internal request -> backend wire request --

impl From<&CompletionRequest> for OpenAiRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.iter().map(Into::into).collect(),
            temperature: req.params.temperature,
            top_p: req.params.top_p,
            max_tokens: req.params.max_tokens,
            stop: req.params.stop.clone(),
            frequency_penalty: req.params.frequency_penalty,
            presence_penalty: req.params.presence_penalty,
            seed: req.params.seed,
            stream: req.stream.then_some(true),
            tools: req.tools.as_ref().map(|tools| {
                tools
                    .iter()
                    .map(|t| OpenAiTool {
                        tool_type: t.tool_type.clone(),
                        function: OpenAiFunction {
                            name: t.function.name.clone(),
                            description: t.function.description.clone(),
                            parameters: t.function.parameters.clone(),
                        },
                    })
                    .collect()
            }),
            tool_choice: req.tool_choice.as_ref().map(tool_choice_value),
            stream_options: req.stream.then_some(OpenAiStreamOptions { include_usage: true }),
        }
    }
}

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone().map(OpenAiContent::Text),
            name: msg.name.clone(),
            tool_calls: msg
                .tool_calls
                .as_ref()
                .map(|calls| calls.iter().map(Into::into).collect()),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<&ToolCall> for OpenAiToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            tool_type: "function".to_owned(),
            function: OpenAiFunctionCall {
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            },
        }
    }
}

fn tool_choice_value(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Mode(mode) => {
            let s = match mode {
                ToolChoiceMode::None => "none",
                ToolChoiceMode::Auto => "auto",
                ToolChoiceMode::Required => "required",
            };
            serde_json::Value::String(s.to_owned())
        }
        ToolChoice::Function(func) => serde_json::json!({
            "type": func.tool_type,
            "function": { "name": func.function.name }
        }),
    }
}

// -- Inbound: backend response -> internal types --

impl From<OpenAiResponse> for CompletionResponse {
    fn from(resp: OpenAiResponse) -> Self {
        Self {
            id: resp.id,
            object: resp.object,
            created: resp.created,
            model: resp.model,
            choices: resp
                .choices
                .into_iter()
                .map(|c| Choice {
                    index: c.index,
                    message: ChoiceMessage {
                        role: c.message.role,
                        content: c.message.content,
                        tool_calls: c
                            .message
                            .tool_calls
                            .map(|calls| calls.into_iter().map(Into::into).collect()),
                    },
                    finish_reason: c.finish_reason.as_deref().map(FinishReason::from_backend),
                })
                .collect(),
            usage: resp.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        }
    }
}

// -- Outbound: internal response -> client wire format --

impl From<CompletionResponse> for OpenAiResponse {
    fn from(resp: CompletionResponse) -> Self {
        Self {
            id: resp.id,
            object: resp.object,
            created: resp.created,
            model: resp.model,
            choices: resp.choices.into_iter().map(Into::into).collect(),
            usage: resp.usage.map(Into::into),
        }
    }
}

impl From<Choice> for OpenAiChoice {
    fn from(choice: Choice) -> Self {
        Self {
            index: choice.index,
            message: OpenAiChoiceMessage {
                role: choice.message.role,
                content: choice.message.content,
                tool_calls: choice
                    .message
                    .tool_calls
                    .map(|calls| calls.iter().map(Into::into).collect()),
            },
            finish_reason: choice.finish_reason.map(|fr| fr.as_str().to_owned()),
        }
    }
}

impl From<Usage> for OpenAiUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

// -- Stream conversion --

/// Convert a backend stream chunk into internal stream events
pub fn chunk_to_events(chunk: &OpenAiStreamChunk) -> Vec<StreamEvent> {
    let mut events: Vec<StreamEvent> = chunk
        .choices
        .iter()
        .map(|choice| StreamEvent::Delta(stream_choice_to_delta(choice)))
        .collect();

    if let Some(usage) = &chunk.usage {
        events.push(StreamEvent::Usage(Usage::new(usage.prompt_tokens, usage.completion_tokens)));
    }

    events
}

fn stream_choice_to_delta(choice: &OpenAiStreamChoice) -> StreamDelta {
    let tool_call = choice
        .delta
        .tool_calls
        .as_ref()
        .and_then(|calls| calls.first())
        .map(|tc| StreamToolCall {
            index: tc.index,
            id: tc.id.clone(),
            function: tc.function.as_ref().map(|f| StreamFunctionCall {
                name: f.name.clone(),
                arguments: f.arguments.clone(),
            }),
        });

    StreamDelta {
        index: choice.index,
        content: choice.delta.content.clone(),
        tool_call,
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_backend),
    }
}

/// Envelope fields shared by every chunk of one stream
#[derive(Debug, Clone)]
pub struct ChunkEnvelope {
    pub id: String,
    pub created: u64,
    pub model: String,
}

impl ChunkEnvelope {
    fn chunk(&self, choices: Vec<OpenAiStreamChoice>, usage: Option<Usage>) -> OpenAiStreamChunk {
        OpenAiStreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_owned(),
            created: self.created,
            model: self.model.clone(),
            choices,
            usage: usage.map(Into::into),
        }
    }

    /// Chunk carrying one delta
    pub fn delta_chunk(&self, delta: &StreamDelta, role: Option<&str>) -> OpenAiStreamChunk {
        let tool_calls = delta.tool_call.as_ref().map(|tc| {
            vec![OpenAiStreamToolCall {
                index: tc.index,
                id: tc.id.clone(),
                tool_type: tc.id.as_ref().map(|_| "function".to_owned()),
                function: tc.function.as_ref().map(|f| OpenAiStreamFunctionCall {
                    name: f.name.clone(),
                    arguments: f.arguments.clone(),
                }),
            }]
        });

        let choice = OpenAiStreamChoice {
            index: delta.index,
            delta: OpenAiStreamDelta {
                role: role.map(str::to_owned),
                content: delta.content.clone(),
                tool_calls,
            },
            finish_reason: None,
        };
        self.chunk(vec![choice], None)
    }

    /// Terminal chunk carrying the finish reason and usage
    pub fn final_chunk(&self, finish_reason: FinishReason, role: Option<&str>, usage: Option<Usage>) -> OpenAiStreamChunk {
        let choice = OpenAiStreamChoice {
            index: 0,
            delta: OpenAiStreamDelta {
                role: role.map(str::to_owned),
                ..OpenAiStreamDelta::default()
            },
            finish_reason: Some(finish_reason.as_str().to_owned()),
        };
        self.chunk(vec![choice], usage)
    }
}
