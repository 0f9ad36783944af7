use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Tool, ToolError};

/// Current UTC time in RFC 3339
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Returns the current UTC time in RFC 3339 format"
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        let mut result = json!({ "utc": jiff::Timestamp::now().to_string() });

        // The requested zone is only echoed back
        if let Some(timezone) = arguments.get("timezone").and_then(Value::as_str) {
            result["timezone"] = Value::String(timezone.to_owned());
        }

        Ok(result.to_string())
    }
}

/// Returns its `text` argument unchanged
pub struct Echo;

#[async_trait]
impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the given text"
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        match arguments.get("text") {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => Err(ToolError::InvalidArguments(format!("`text` must be a string, got {other}"))),
            None => Err(ToolError::InvalidArguments("`text` is required".to_owned())),
        }
    }
}
