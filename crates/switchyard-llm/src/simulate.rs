//! Prompt-level tool calling for backends without native support
//!
//! Tools are described in a system message that asks the model to answer
//! with a single `{"tool_call": {"name": ..., "arguments": {...}}}` object.
//! Replies are scanned for that object and turned back into tool calls.

use std::fmt::Write as _;

use serde_json::{Value, json};

use crate::types::{ToolCall, ToolDefinition};

/// Key that marks a simulated tool call in model output
pub const MARKER_KEY: &str = "tool_call";

/// System prompt describing the available tools and the reply format
pub fn tool_instructions(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::from("You have access to the following tools:\n\n");

    for tool in tools {
        let function = &tool.function;
        let _ = write!(prompt, "- {}", function.name);
        if let Some(description) = function.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(prompt, ": {description}");
        }
        prompt.push('\n');
        if let Some(parameters) = &function.parameters {
            let _ = writeln!(prompt, "  parameters: {parameters}");
        }
    }

    prompt.push_str(
        "\nTo use a tool, reply with a single JSON object and nothing else, in exactly this shape:\n\
         {\"tool_call\": {\"name\": \"<tool name>\", \"arguments\": {<arguments>}}}\n\
         If no tool is needed, answer normally.",
    );
    prompt
}

/// Find a simulated tool call in model output
///
/// The object is located by the first occurrence of the marker key, the
/// opening brace before it, and the last closing brace of the text, so
/// surrounding prose is tolerated. When trailing prose holds braces of its
/// own, earlier closing braces are tried in turn.
pub fn extract_tool_call(content: &str) -> Option<ToolCall> {
    let marker = content.find(&format!("\"{MARKER_KEY}\""))?;
    let start = content[..marker].rfind('{')?;

    let object = content
        .rmatch_indices('}')
        .take_while(|(end, _)| *end > marker)
        .find_map(|(end, _)| serde_json::from_str::<Value>(&content[start..=end]).ok())?;

    let call = object.get(MARKER_KEY)?;
    let name = call.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let arguments = match call.get("arguments") {
        Some(Value::String(raw)) => raw.clone(),
        Some(value @ Value::Object(_)) => value.to_string(),
        _ => "{}".to_owned(),
    };

    Some(ToolCall::new(
        format!("call_{}", uuid::Uuid::new_v4().simple()),
        name,
        arguments,
    ))
}

/// Marker text for a tool call, used when replaying earlier turns
pub fn render_tool_call(call: &ToolCall) -> String {
    let arguments = serde_json::from_str::<Value>(&call.function.arguments)
        .unwrap_or_else(|_| Value::String(call.function.arguments.clone()));

    json!({ MARKER_KEY: { "name": call.function.name, "arguments": arguments } }).to_string()
}
