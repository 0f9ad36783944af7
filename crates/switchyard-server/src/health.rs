use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Body served by the health endpoint
///
/// Provider names are fixed at startup so the report is built once.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    status: &'static str,
    available_providers: Vec<String>,
    default_provider: String,
}

impl HealthReport {
    pub fn new(available_providers: Vec<String>, default_provider: impl Into<String>) -> Self {
        Self {
            status: "ok",
            available_providers,
            default_provider: default_provider.into(),
        }
    }
}

/// Health check handler
pub async fn health_handler(State(report): State<Arc<HealthReport>>) -> Json<HealthReport> {
    Json(report.as_ref().clone())
}
