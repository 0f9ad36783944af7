use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, LlmProviderType};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, the default provider
    /// is unknown, a credential or pattern is invalid, or a numeric limit
    /// is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;
        self.validate_default_provider()?;
        self.validate_limits()?;
        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if self.llm.providers.is_empty() {
            anyhow::bail!("at least one LLM provider must be configured under [llm.providers]");
        }

        for (name, provider) in &self.llm.providers {
            if provider.provider_type == LlmProviderType::Openai
                && provider
                    .api_key
                    .as_ref()
                    .is_none_or(|key| key.expose_secret().trim().is_empty())
            {
                anyhow::bail!("provider '{name}' of type openai requires a non-empty api_key");
            }

            for pattern in &provider.models.include {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("invalid model include pattern for provider '{name}': {e}"))?;
            }
            for pattern in &provider.models.exclude {
                regex::Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("invalid model exclude pattern for provider '{name}': {e}"))?;
            }
        }

        Ok(())
    }

    fn validate_default_provider(&self) -> anyhow::Result<()> {
        let Some(default) = &self.llm.default_provider else {
            anyhow::bail!("llm.default_provider must be set");
        };

        if !self.llm.providers.contains_key(default) {
            anyhow::bail!("llm.default_provider '{default}' does not name a configured provider");
        }

        Ok(())
    }

    fn validate_limits(&self) -> anyhow::Result<()> {
        self.llm.request_timeout()?;
        self.llm.discovery_interval()?;

        if self.tools.max_iterations == 0 {
            anyhow::bail!("tools.max_iterations must be at least 1");
        }

        Ok(())
    }
}
