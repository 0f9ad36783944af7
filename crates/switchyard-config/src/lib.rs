#![allow(clippy::must_use_candidate)]

pub mod conversation_log;
mod env;
pub mod health;
pub mod llm;
mod loader;
pub mod responses;
pub mod server;
pub mod telemetry;
pub mod tools;

use serde::Deserialize;

pub use conversation_log::*;
pub use health::*;
pub use llm::*;
pub use responses::*;
pub use server::*;
pub use telemetry::*;
pub use tools::*;

/// Top-level Switchyard configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Local tool execution
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Append-only request/response log
    #[serde(default)]
    pub conversation_log: ConversationLogConfig,
    /// In-memory store of completed responses
    #[serde(default)]
    pub responses: ResponsesConfig,
}
