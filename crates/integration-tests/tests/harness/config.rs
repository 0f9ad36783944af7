//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use secrecy::SecretString;
use switchyard_config::{
    Config, ConversationLogConfig, HealthConfig, LlmProviderConfig, LlmProviderType, ModelConfig, ServerConfig,
};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig::default(),
                },
                ..Config::default()
            },
        }
    }

    /// Add an OpenAI-compatible provider pointed at a mock backend
    ///
    /// The first provider added becomes the default.
    pub fn with_openai_provider(self, name: &str, base_url: &str) -> Self {
        self.with_provider(name, LlmProviderType::Openai, base_url, Some(SecretString::from("test-key")))
    }

    /// Add an Ollama provider pointed at a mock backend
    pub fn with_ollama_provider(self, name: &str, base_url: &str) -> Self {
        self.with_provider(name, LlmProviderType::Ollama, base_url, None)
    }

    fn with_provider(
        mut self,
        name: &str,
        provider_type: LlmProviderType,
        base_url: &str,
        api_key: Option<SecretString>,
    ) -> Self {
        self.config.llm.providers.insert(
            name.to_owned(),
            LlmProviderConfig {
                provider_type,
                api_key,
                base_url: Some(base_url.parse().expect("valid URL")),
                models: ModelConfig::default(),
                fallback_models: Vec::new(),
            },
        );
        self.config.llm.default_provider.get_or_insert_with(|| name.to_owned());
        self
    }

    /// Restrict a provider's catalog with include patterns
    pub fn with_model_include(mut self, provider: &str, patterns: &[&str]) -> Self {
        let provider = self.config.llm.providers.get_mut(provider).expect("provider added first");
        provider.models.include = patterns.iter().map(|p| (*p).to_owned()).collect();
        self
    }

    /// Catalog used when a provider's listing fails
    pub fn with_fallback_models(mut self, provider: &str, models: &[&str]) -> Self {
        let provider = self.config.llm.providers.get_mut(provider).expect("provider added first");
        provider.fallback_models = models.iter().map(|m| (*m).to_owned()).collect();
        self
    }

    pub fn with_default_provider(mut self, name: &str) -> Self {
        self.config.llm.default_provider = Some(name.to_owned());
        self
    }

    /// Pass tool calls through to the caller instead of executing them
    pub fn without_tools(mut self) -> Self {
        self.config.tools.enabled = false;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.tools.max_iterations = max_iterations;
        self
    }

    pub fn without_response_store(mut self) -> Self {
        self.config.responses.store = false;
        self
    }

    pub fn with_conversation_log(mut self, directory: &Path) -> Self {
        self.config.conversation_log = ConversationLogConfig {
            enabled: true,
            directory: directory.to_path_buf(),
        };
        self
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        self.config.server.health.path = path.to_owned();
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
