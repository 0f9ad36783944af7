//! Provider trait and implementations for LLM backends

pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use switchyard_config::{LlmProviderConfig, LlmProviderType};

use crate::error::LlmError;
use crate::stream::EventStream;
use crate::types::{CompletionRequest, CompletionResponse};

/// Capabilities advertised by a provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    /// Whether the provider supports streaming responses
    pub streaming: bool,
    /// Whether the backend understands tool definitions natively
    pub native_tools: bool,
}

/// Trait implemented by each LLM provider backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Configured provider name
    fn name(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Model identifiers reported by the backend
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Send a non-streaming completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Send a streaming completion request
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream, LlmError>;
}

/// Construct the provider for one `[llm.providers.<name>]` entry
///
/// Each provider gets its own pooled HTTP client.
pub fn build_provider(
    name: &str,
    config: &LlmProviderConfig,
    timeout: Option<Duration>,
) -> Result<Arc<dyn Provider>, LlmError> {
    let client = build_client(timeout)?;

    let provider: Arc<dyn Provider> = match config.provider_type {
        LlmProviderType::Openai => Arc::new(openai::OpenAiProvider::new(name.to_owned(), config, client)?),
        LlmProviderType::Ollama => Arc::new(ollama::OllamaProvider::new(name.to_owned(), config, client)?),
    };

    tracing::debug!(
        provider = %name,
        provider_type = config.provider_type.as_str(),
        "provider initialized"
    );

    Ok(provider)
}

fn build_client(timeout: Option<Duration>) -> Result<Client, LlmError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// `base` joined with a relative `path`
fn endpoint(base: &url::Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    format!("{base}/{path}")
}

/// Map a failed send onto an upstream error without a status
fn transport_error(provider: &str, error: &reqwest::Error) -> LlmError {
    tracing::error!(provider = %provider, error = %error, "upstream request failed");
    LlmError::transport(format!("request to provider '{provider}' failed: {error}"))
}

/// Map a non-success response onto an upstream error carrying its status
async fn status_error(provider: &str, response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    tracing::warn!(provider = %provider, status = status.as_u16(), "upstream returned error");

    LlmError::Upstream {
        status: Some(status.as_u16()),
        message: format!("provider returned {status}: {body}"),
    }
}
