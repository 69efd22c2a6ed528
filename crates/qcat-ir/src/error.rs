//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur while building a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit")]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Measurement operands do not pair up.
    #[error("Measurement has {qubits} qubits but {clbits} classical bits")]
    MeasureArity {
        /// Number of measured qubits.
        qubits: usize,
        /// Number of target classical bits.
        clbits: usize,
    },
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
