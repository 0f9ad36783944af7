//! Local tools the gateway can execute on the model's behalf

mod builtin;
mod dispatch;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

pub use builtin::{CurrentTime, Echo};
pub use dispatch::ToolDispatcher;

/// Failure raised by a tool implementation
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),
}

/// A locally executable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the tool, returning the text handed back to the model
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolError>;
}

/// Lookup of tools by exact name
pub trait ToolRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>>;

    /// Registered names in registration order
    fn names(&self) -> Vec<String>;
}

/// Registry fixed at construction
#[derive(Default)]
pub struct StaticRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl StaticRegistry {
    /// Registry holding the built-in tools
    pub fn builtin() -> Self {
        Self::default().with_tool(CurrentTime).with_tool(Echo)
    }

    /// Add a tool, replacing any tool of the same name
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.insert(tool.name().to_owned(), Arc::new(tool));
        self
    }
}

impl ToolRegistry for StaticRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}
