//! Ollama native provider implementation
//!
//! Speaks `/api/chat` and `/api/tags`. Tool calling is simulated through
//! the prompt, see [`crate::simulate`].

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use switchyard_config::LlmProviderConfig;
use url::Url;

use super::{Provider, ProviderCapabilities, endpoint, transport_error};
use crate::convert::ollama::{from_ollama_response, stream_events, to_ollama_request};
use crate::error::LlmError;
use crate::ndjson;
use crate::protocol::ollama::{OllamaChatResponse, OllamaError, OllamaTags};
use crate::stream::{self, ContentAccumulator, EventStream};
use crate::types::{CompletionRequest, CompletionResponse};

/// Default local Ollama address
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama provider
pub struct OllamaProvider {
    name: String,
    client: Client,
    base_url: Url,
}

impl OllamaProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if the default base URL cannot be parsed.
    pub fn new(name: String, config: &LlmProviderConfig, client: Client) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| LlmError::Configuration(e.to_string()))?,
        };

        Ok(Self { name, client, base_url })
    }

    async fn send_chat(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response, LlmError> {
        let wire_request = to_ollama_request(request, stream);

        let response = self
            .client
            .post(endpoint(&self.base_url, "api/chat"))
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, &e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.backend_error(response).await)
        }
    }

    /// Prefer Ollama's `{"error": ...}` text over the raw body
    async fn backend_error(&self, response: reqwest::Response) -> LlmError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<OllamaError>(&body).map_or(body, |e| e.error);

        tracing::warn!(provider = %self.name, status = status.as_u16(), "upstream returned error");

        LlmError::Upstream {
            status: Some(status.as_u16()),
            message: format!("provider returned {status}: {detail}"),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            native_tools: false,
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "api/tags"))
            .send()
            .await
            .map_err(|e| transport_error(&self.name, &e))?;

        if !response.status().is_success() {
            return Err(self.backend_error(response).await);
        }

        let tags: OllamaTags = response.json().await.map_err(|e| LlmError::Upstream {
            status: None,
            message: format!("failed to parse model tags: {e}"),
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self.send_chat(request, false).await?;

        let body = response.text().await.map_err(|e| transport_error(&self.name, &e))?;
        let wire_response: OllamaChatResponse = serde_json::from_str(&body).map_err(|e| LlmError::Upstream {
            status: None,
            message: format!("failed to parse ollama response: {e}"),
        })?;

        from_ollama_response(wire_response, request.offers_tools())
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream, LlmError> {
        // Marker JSON can only be recognized once the reply is complete
        if request.offers_tools() {
            tracing::debug!(provider = %self.name, "buffering stream to detect simulated tool calls");
            let response = self.complete(request).await?;
            let events = stream::replay(&response).into_iter().map(Ok::<_, LlmError>);
            return Ok(Box::pin(futures_util::stream::iter(events)));
        }

        let response = self.send_chat(request, true).await?;

        let mut accumulator = ContentAccumulator::default();
        let mapped = ndjson::decode::<_, _, OllamaChatResponse>(response.bytes_stream())
            .map(move |line| match line {
                Ok(line) => stream_events(line, &mut accumulator).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}
