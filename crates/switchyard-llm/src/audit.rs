//! Append-only conversation log

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File name written inside the configured directory
pub const LOG_FILE_NAME: &str = "completions.ndjson";

/// Sink for raw requests and their outcomes
///
/// Recording never blocks the caller and never fails the request.
pub trait ConversationLog: Send + Sync {
    fn record(&self, request: Value, outcome: Value);
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NoopConversationLog;

impl ConversationLog for NoopConversationLog {
    fn record(&self, _request: Value, _outcome: Value) {}
}

/// Appends a request line and a response line per completion
#[derive(Debug, Clone)]
pub struct NdjsonConversationLog {
    path: Arc<PathBuf>,
    /// Keeps the two lines of one completion adjacent
    write_lock: Arc<Mutex<()>>,
}

impl NdjsonConversationLog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(directory.into().join(LOG_FILE_NAME)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn append(&self, request: Value, outcome: Value) -> std::io::Result<()> {
        let mut lines = json!({ "type": "request", "data": request }).to_string();
        lines.push('\n');
        lines.push_str(&json!({ "type": "response", "data": outcome }).to_string());
        lines.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await
    }
}

impl ConversationLog for NdjsonConversationLog {
    fn record(&self, request: Value, outcome: Value) {
        let log = self.clone();
        tokio::spawn(async move {
            if let Err(e) = log.append(request, outcome).await {
                tracing::warn!(path = %log.path.display(), error = %e, "failed to write conversation log");
            }
        });
    }
}
