use http::StatusCode;
use serde::Serialize;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The server layer
/// converts these into actual HTTP responses, keeping domain errors
/// decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Status reported by a backend, when the failure originated there
    fn upstream_code(&self) -> Option<u16> {
        None
    }
}

/// `{"error": {...}}` envelope returned for every user-visible failure
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error object
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    /// Backend status, `null` when the failure was local
    pub code: Option<u16>,
}

impl ErrorBody {
    /// Build the envelope from any domain error
    pub fn from_error<E: HttpError + ?Sized>(error: &E) -> Self {
        Self {
            error: ErrorDetail {
                message: error.client_message(),
                error_type: error.error_type().to_owned(),
                code: error.upstream_code(),
            },
        }
    }
}
