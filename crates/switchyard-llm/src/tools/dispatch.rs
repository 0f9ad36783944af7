use std::sync::Arc;

use serde_json::{Map, Value};

use super::ToolRegistry;
use crate::error::LlmError;
use crate::provider::Provider;
use crate::schema::ToolDescriptor;
use crate::types::{CompletionRequest, CompletionResponse, Message, ToolCall};

/// Bounded completion loop that executes requested tools locally
pub struct ToolDispatcher {
    registry: Arc<dyn ToolRegistry>,
    max_iterations: u32,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<dyn ToolRegistry>, max_iterations: u32) -> Self {
        Self {
            registry,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Complete `request`, executing tool calls until the model stops
    /// asking for them or the iteration cap is reached
    ///
    /// Each iteration is one backend completion call. When the cap is hit
    /// the last response is returned even if it still requests tools.
    pub async fn run(
        &self,
        provider: &dyn Provider,
        request: &CompletionRequest,
        descriptors: &[ToolDescriptor],
    ) -> Result<CompletionResponse, LlmError> {
        let mut request = request.clone();
        request.stream = false;

        let mut iteration = 1;
        loop {
            let response = provider.complete(&request).await?;

            let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                return Ok(response);
            }

            if iteration >= self.max_iterations {
                tracing::warn!(
                    provider = provider.name(),
                    iteration,
                    pending = calls.len(),
                    "tool iteration limit reached, returning last response"
                );
                return Ok(response);
            }

            tracing::debug!(provider = provider.name(), iteration, calls = calls.len(), "executing tool calls");

            for choice in &response.choices {
                if let Some(choice_calls) = choice.message.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                    request.messages.push(Message::assistant_tool_calls(
                        choice.message.content.clone(),
                        choice_calls.clone(),
                    ));
                }
            }

            for call in &calls {
                let output = self.execute(call, descriptors).await;
                request.messages.push(Message::tool_result(call.id.clone(), output));
            }

            iteration += 1;
        }
    }

    /// Run one tool call; failures become the result text
    async fn execute(&self, call: &ToolCall, descriptors: &[ToolDescriptor]) -> String {
        let name = call.function.name.as_str();

        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = %name, "model requested unknown tool");
            let available = self.registry.names();
            let available = if available.is_empty() {
                "none".to_owned()
            } else {
                available.join(", ")
            };
            return format!("Error: unknown tool '{name}'. Available tools: {available}");
        };

        let mut arguments = match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::debug!(tool = %name, arguments = %call.function.arguments, "tool arguments are not a JSON object");
                Map::new()
            }
        };

        // Violations are reported but do not block execution
        if let Some(descriptor) = descriptors.iter().find(|d| d.name == name) {
            let violations = descriptor.validate(&arguments);
            if !violations.is_empty() {
                let summary = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
                tracing::debug!(tool = %name, violations = %summary, "tool arguments do not match schema");
            }
            arguments = descriptor.apply_defaults(arguments);
        }

        match tool.call(arguments).await {
            Ok(output) => {
                tracing::debug!(tool = %name, "tool executed");
                output
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool execution failed");
                format!("Error executing tool '{name}': {e}")
            }
        }
    }
}
