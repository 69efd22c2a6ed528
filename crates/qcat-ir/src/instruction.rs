//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(StandardGate),
    /// Measurement of each qubit into the paired classical bit.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (synchronization point).
    Barrier,
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction writes (measure only).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: StandardGate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a multi-qubit measurement instruction.
    ///
    /// Returns an error if the number of qubits and classical bits do not match.
    pub fn measure_many(
        qubits: impl IntoIterator<Item = QubitId>,
        clbits: impl IntoIterator<Item = ClbitId>,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        let clbits: Vec<_> = clbits.into_iter().collect();
        if qubits.len() != clbits.len() {
            return Err(IrError::MeasureArity {
                qubits: qubits.len(),
                clbits: clbits.len(),
            });
        }
        Ok(Self {
            kind: InstructionKind::Measure,
            qubits,
            clbits,
        })
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Get the name of this instruction.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&StandardGate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        assert!(inst.is_gate());
        assert_eq!(inst.name(), "cx");
        assert_eq!(inst.qubits, vec![QubitId(0), QubitId(1)]);
        assert!(inst.clbits.is_empty());
    }

    #[test]
    fn test_measure_many_arity() {
        let ok = Instruction::measure_many([QubitId(0), QubitId(1)], [ClbitId(0), ClbitId(1)]);
        assert!(ok.unwrap().is_measure());

        let err = Instruction::measure_many([QubitId(0), QubitId(1)], [ClbitId(0)]);
        assert!(matches!(
            err,
            Err(IrError::MeasureArity {
                qubits: 2,
                clbits: 1
            })
        ));
    }
}
