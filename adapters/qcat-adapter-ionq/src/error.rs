//! Error types for the IonQ adapter.

use thiserror::Error;

/// Result type for IonQ operations.
pub type IonqResult<T> = Result<T, IonqError>;

/// Errors that can occur when interacting with IonQ.
#[derive(Debug, Error)]
pub enum IonqError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing IonQ API key.
    #[error("Missing IonQ API key: set IONQ_API_KEY environment variable")]
    MissingApiKey,

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job execution failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Circuit contains a gate IonQ cannot express.
    #[error("Unsupported gate: {0}")]
    UnsupportedGate(String),

    /// Circuit exceeds the target's qubit count.
    #[error("Circuit too large: {0}")]
    CircuitTooLarge(String),

    /// Completed job returned a malformed result.
    #[error("Malformed result: {0}")]
    MalformedResult(String),
}

impl From<IonqError> for qcat_hal::HalError {
    fn from(e: IonqError) -> Self {
        match e {
            IonqError::MissingApiKey => qcat_hal::HalError::AuthenticationFailed(e.to_string()),
            IonqError::ApiError {
                status: 401 | 403, ..
            } => qcat_hal::HalError::AuthenticationFailed(e.to_string()),
            IonqError::Http(err) => qcat_hal::HalError::Network(err),
            IonqError::Json(err) => qcat_hal::HalError::Serialization(err),
            IonqError::JobNotFound(id) => qcat_hal::HalError::JobNotFound(id),
            IonqError::JobFailed(msg) => qcat_hal::HalError::JobFailed(msg),
            IonqError::UnsupportedGate(gate) => {
                qcat_hal::HalError::InvalidCircuit(format!("Unsupported gate: {gate}"))
            }
            IonqError::CircuitTooLarge(msg) => qcat_hal::HalError::CircuitTooLarge(msg),
            _ => qcat_hal::HalError::Backend(e.to_string()),
        }
    }
}
