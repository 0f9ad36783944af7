use serde::Deserialize;

/// Local tool dispatch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Execute model-requested tools locally; when off, tool calls reach the caller
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum completion calls per top-level request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_iterations() -> u32 {
    5
}
