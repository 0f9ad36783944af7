//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use switchyard_config::LlmProviderConfig;
use url::Url;

use super::{Provider, ProviderCapabilities, endpoint, status_error, transport_error};
use crate::convert::openai::chunk_to_events;
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiModelList, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk};
use crate::stream::EventStream;
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Whether the provider is the canonical `OpenAI` API (vs a compatible third-party)
fn is_canonical_openai(base_url: &Url) -> bool {
    base_url.host_str().is_some_and(|h| h == "api.openai.com")
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiProvider {
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

        Ok(Self {
            name,
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(endpoint(&self.base_url, path)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            native_tools: true,
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .authorize(self.client.get(endpoint(&self.base_url, "models")))
            .send()
            .await
            .map_err(|e| transport_error(&self.name, &e))?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        let body: OpenAiModelList = response.json().await.map_err(|e| LlmError::Upstream {
            status: None,
            message: format!("failed to parse model list: {e}"),
        })?;

        Ok(body.data.into_iter().map(|m| m.id).collect())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut wire_request = OpenAiRequest::from(request);
        wire_request.stream = None;
        wire_request.stream_options = None;

        let response = self
            .post("chat/completions")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, &e))?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        let wire_response: OpenAiResponse = response.json().await.map_err(|e| LlmError::Upstream {
            status: None,
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(wire_response.into())
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream, LlmError> {
        let mut wire_request = OpenAiRequest::from(request);
        wire_request.stream = Some(true);

        // Compatible servers commonly reject `stream_options`
        if !is_canonical_openai(&self.base_url) {
            wire_request.stream_options = None;
        }

        let response = self
            .post("chat/completions")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, &e))?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        let mapped = response
            .bytes_stream()
            .eventsource()
            .map(|result| match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data == "[DONE]" {
                        return vec![Ok(StreamEvent::Done)];
                    }

                    match serde_json::from_str::<OpenAiStreamChunk>(data) {
                        Ok(chunk) => chunk_to_events(&chunk).into_iter().map(Ok).collect(),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                            vec![]
                        }
                    }
                }
                Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}
