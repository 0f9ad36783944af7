use std::path::PathBuf;

use serde::Deserialize;

/// Conversation log configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationLogConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Directory holding `completions.ndjson`
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for ConversationLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_directory(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("logs")
}
