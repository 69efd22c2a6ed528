//! Error types for IBM Quantum adapter.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when using IBM Quantum.
#[derive(Debug, Error)]
pub enum IbmError {
    /// Missing API token.
    #[error("IBM Quantum API token not found. Save an account or set IBM_QUANTUM_TOKEN.")]
    MissingToken,

    /// Invalid API token.
    #[error("Invalid IBM Quantum API token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("IBM Quantum API error: {message}")]
    ApiError {
        /// HTTP status code.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job was cancelled: {0}")]
    JobCancelled(String),

    /// Circuit conversion error.
    #[error("Circuit conversion error: {0}")]
    CircuitError(String),

    /// Backend not available.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// No operational device in the instance.
    #[error("No operational device available for instance {0}")]
    NoDeviceAvailable(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Circuit too large for backend.
    #[error("Circuit requires {required} qubits but backend only has {available}")]
    TooManyQubits {
        /// Qubits needed.
        required: usize,
        /// Qubits available.
        available: usize,
    },

    /// Invalid parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Account file could not be read or written.
    #[error("Account store error at {path}: {source}")]
    AccountStore {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl From<IbmError> for qcat_hal::HalError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingToken | IbmError::InvalidToken => {
                qcat_hal::HalError::AuthenticationFailed(e.to_string())
            }
            IbmError::ApiError {
                status: Some(401 | 403),
                ..
            } => qcat_hal::HalError::AuthenticationFailed(e.to_string()),
            IbmError::JobNotFound(id) => qcat_hal::HalError::JobNotFound(id),
            IbmError::JobFailed(msg) => qcat_hal::HalError::JobFailed(msg),
            IbmError::JobCancelled(_) => qcat_hal::HalError::JobCancelled,
            IbmError::BackendUnavailable(msg) => qcat_hal::HalError::BackendUnavailable(msg),
            IbmError::NoDeviceAvailable(_) => {
                qcat_hal::HalError::BackendUnavailable(e.to_string())
            }
            IbmError::CircuitError(msg) => qcat_hal::HalError::InvalidCircuit(msg),
            IbmError::TooManyQubits {
                required,
                available,
            } => qcat_hal::HalError::CircuitTooLarge(format!(
                "Circuit requires {required} qubits but backend only has {available}"
            )),
            IbmError::InvalidParameter(_) | IbmError::AccountStore { .. } => {
                qcat_hal::HalError::Configuration(e.to_string())
            }
            IbmError::HttpError(err) => qcat_hal::HalError::Network(err),
            IbmError::JsonError(err) => qcat_hal::HalError::Serialization(err),
            IbmError::ApiError { .. } => qcat_hal::HalError::Backend(e.to_string()),
        }
    }
}
