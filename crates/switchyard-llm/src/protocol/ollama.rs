//! Ollama native chat API wire format types

use serde::{Deserialize, Deserializer, Serialize};

/// `POST /api/chat` request body
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Sampling options; Ollama names the token limit `num_predict`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl OllamaOptions {
    /// Whether no option is set, in which case the field is omitted
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Chat message as Ollama sends and receives it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaMessage {
    #[serde(default = "assistant_role")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: String,
}

fn assistant_role() -> String {
    "assistant".to_owned()
}

/// Content that is null or not a string reads as empty
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => text,
        _ => String::new(),
    })
}

/// One `/api/chat` response object
///
/// Non-streaming calls return a single object; streaming calls return one
/// per line with `done: false` until the last.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_eval_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub eval_count: Option<u32>,
}

/// Token counts that are not a non-negative integer read as unknown
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|count| u32::try_from(count).ok()))
}

/// `GET /api/tags` response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTags {
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTag {
    pub name: String,
}

/// Error body returned by Ollama on failure
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaError {
    pub error: String,
}
