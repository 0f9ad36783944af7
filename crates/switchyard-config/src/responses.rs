use serde::Deserialize;

/// Completed-response store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponsesConfig {
    /// Keep every completed non-streaming response in memory, retrievable by id
    #[serde(default = "default_store")]
    pub store: bool,
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self { store: true }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_store() -> bool {
    true
}
