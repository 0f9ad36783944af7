use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Top-level LLM configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider used when a model matches no catalog entry
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Per-call backend timeout (e.g. "30s"); unset means no timeout
    #[serde(default)]
    pub request_timeout: Option<String>,
    /// How often provider catalogs are re-fetched (e.g. "5m")
    #[serde(default = "default_discovery_interval")]
    pub discovery_interval: String,
    /// LLM provider configurations keyed by name, in declaration order
    #[serde(default)]
    pub providers: IndexMap<String, LlmProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            request_timeout: None,
            discovery_interval: default_discovery_interval(),
            providers: IndexMap::new(),
        }
    }
}

impl LlmConfig {
    /// Parsed `request_timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed
    pub fn request_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.request_timeout
            .as_deref()
            .map(|s| parse_duration("llm.request_timeout", s))
            .transpose()
    }

    /// Parsed `discovery_interval`
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed or zero
    pub fn discovery_interval(&self) -> anyhow::Result<Duration> {
        let interval = parse_duration("llm.discovery_interval", &self.discovery_interval)?;
        if interval.is_zero() {
            anyhow::bail!("llm.discovery_interval must be greater than zero");
        }
        Ok(interval)
    }
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration '{value}' for {field}: {e}"))
}

fn default_discovery_interval() -> String {
    "5m".to_string()
}

/// Configuration for a single LLM provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmProviderConfig {
    /// Provider protocol type
    #[serde(rename = "type")]
    pub provider_type: LlmProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Catalog filters
    #[serde(default)]
    pub models: ModelConfig,
    /// Catalog reported when the listing endpoint fails
    #[serde(default)]
    pub fallback_models: Vec<String>,
}

/// Supported LLM provider protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderType {
    /// OpenAI-compatible API
    Openai,
    /// Ollama native chat API
    Ollama,
}

impl LlmProviderType {
    /// Lowercase identifier as written in configuration
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Ollama => "ollama",
        }
    }
}

/// Model catalog filters for a provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Include models matching these patterns (regex)
    #[serde(default)]
    pub include: Vec<String>,
    /// Exclude models matching these patterns (regex)
    #[serde(default)]
    pub exclude: Vec<String>,
}
