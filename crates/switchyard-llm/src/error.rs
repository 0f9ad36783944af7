use http::StatusCode;
use switchyard_core::HttpError;
use thiserror::Error;

use crate::schema::SchemaError;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Named provider does not exist in configuration
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: String },

    /// No stored response carries this id
    #[error("response not found: {id}")]
    ResponseNotFound { id: String },

    /// Provider could not be constructed from configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Upstream provider failed or returned an error status
    #[error("upstream error: {message}")]
    Upstream {
        /// Backend HTTP status, absent for transport failures
        status: Option<u16>,
        message: String,
    },

    /// Error during streaming response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Transport-level failure with no backend status
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }
}

impl From<SchemaError> for LlmError {
    fn from(error: SchemaError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ProviderNotFound { .. } | Self::ResponseNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Configuration(_) | Self::Streaming(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::ProviderNotFound { .. } | Self::ResponseNotFound { .. } => "not_found_error",
            Self::Configuration(_) => "configuration_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Streaming(_) => "streaming_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }

    fn upstream_code(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}
