//! Error types for the dispatch layer.

use qcat_adapter_ibm::IbmError;
use qcat_adapter_ionq::IonqError;
use qcat_hal::HalError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for dispatch operations.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors raised while dispatching a circuit.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Selector string other than `qasm_simulator` or `statevector_simulator`.
    #[error("Unknown simulator selector: {0:?}")]
    UnknownSelector(String),

    /// Combination of backend and selector that cannot be served.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Error from a HAL backend.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Error from the IBM Quantum client.
    #[error(transparent)]
    Ibm(#[from] IbmError),

    /// Error from the IonQ client.
    #[error(transparent)]
    Ionq(#[from] IonqError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tracing could not be installed.
    #[error("Tracing setup failed: {0}")]
    Telemetry(String),
}
