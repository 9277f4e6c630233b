//! Oracle error types.

use thiserror::Error;

/// Errors that can occur when asking the local model for an answer.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The requested model is not pulled locally.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The model replied, but not with an answer in the requested shape.
    #[error("malformed answer: {0}")]
    MalformedAnswer(String),
}

impl OracleError {
    /// Whether asking again cannot succeed without operator action.
    pub fn is_permanent(&self) -> bool {
        match self {
            OracleError::ModelNotFound(_) => true,
            OracleError::ApiError { status, .. } => (400..500).contains(status),
            OracleError::Timeout(_)
            | OracleError::NetworkError(_)
            | OracleError::MalformedAnswer(_) => false,
        }
    }
}
