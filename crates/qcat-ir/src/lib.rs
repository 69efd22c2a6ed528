//! qcat Circuit Intermediate Representation
//!
//! The circuit type every qcat backend consumes. A [`Circuit`] is an ordered
//! list of [`Instruction`]s over a fixed set of qubits and classical bits;
//! backends treat it as an immutable input.
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qcat_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.measured_qubits(), vec![QubitId(0), QubitId(1)]);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `H` | 1 | Hadamard gate |
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `S`, `Sdg`, `T`, `Tdg`, `SX` | 1 | Clifford+T gates |
//! | `Rx`, `Ry`, `Rz`, `P` | 1 | Rotation and phase gates |
//! | `U` | 1 | Universal single-qubit gate U(θ,φ,λ) |
//! | `CX`, `CY`, `CZ`, `CH` | 2 | Controlled gates |
//! | `CRz`, `CP` | 2 | Controlled rotations |
//! | `Swap`, `ISwap` | 2 | Swap gates |
//! | `CCX`, `CSwap` | 3 | Toffoli and Fredkin gates |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{ClbitId, QubitId};
