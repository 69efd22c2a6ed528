//! Quantum gate types.

use serde::{Deserialize, Serialize};

/// Standard gates with known semantics.
///
/// Rotation angles are bound `f64` radians: circuits reach the dispatch layer
/// fully built, so there is no symbolic parameter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// Phase gate.
    P(f64),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(f64, f64, f64),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around Z.
    CRz(f64),
    /// Controlled phase gate.
    CP(f64),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// OpenQASM 3 `stdgates.inc` name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(..) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(..) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRz(_)
            | StandardGate::CP(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Get the angle parameters of this gate, in declaration order.
    pub fn parameters(&self) -> Vec<f64> {
        match *self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p) => vec![p],
            StandardGate::U(theta, phi, lambda) => vec![theta, phi, lambda],
            _ => vec![],
        }
    }
}
