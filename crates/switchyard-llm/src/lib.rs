//! Core LLM gateway crate for Switchyard
//!
//! Fronts OpenAI-compatible and Ollama backends behind one OpenAI-style
//! API, with catalog-driven model routing, local tool execution and
//! prompt-simulated tool calling for backends without native support.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod audit;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod format;
#[cfg(feature = "http")]
pub mod handler;
pub mod ndjson;
pub mod protocol;
pub mod provider;
pub mod routing;
pub mod schema;
pub mod simulate;
pub mod state;
pub mod store;
pub mod stream;
pub mod tools;
pub mod types;

pub use error::LlmError;
#[cfg(feature = "http")]
pub use handler::llm_router;
pub use provider::{Provider, ProviderCapabilities};
pub use routing::{ModelRouter, ResolvedModel};
pub use state::{ListedModel, LlmState};
pub use types::{CompletionRequest, CompletionResponse, StreamEvent};
