//! High-level circuit builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit.
///
/// Instructions are kept in program order. Every instruction is checked
/// against the circuit's qubits and classical bits when it is appended, so a
/// `Circuit` handed to a backend is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubits.
    num_qubits: u32,
    /// Number of classical bits.
    num_clbits: u32,
    /// Instructions in program order.
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: 0,
            num_clbits: 0,
            instructions: vec![],
        }
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            instructions: vec![],
        }
    }

    /// Add a single qubit to the circuit.
    pub fn add_qubit(&mut self) -> QubitId {
        let id = QubitId(self.num_qubits);
        self.num_qubits += 1;
        id
    }

    /// Add a single classical bit to the circuit.
    pub fn add_clbit(&mut self) -> ClbitId {
        let id = ClbitId(self.num_clbits);
        self.num_clbits += 1;
        id
    }

    /// Append a validated instruction.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.check(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    fn check(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = || Some(instruction.name().to_string());

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let got = instruction.qubits.len() as u32;
            if got != gate.num_qubits() {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got,
                });
            }
        }

        if matches!(instruction.kind, InstructionKind::Reset) && instruction.qubits.len() != 1 {
            return Err(IrError::QubitCountMismatch {
                gate_name: "reset".to_string(),
                expected: 1,
                got: instruction.qubits.len() as u32,
            });
        }

        for (i, qubit) in instruction.qubits.iter().enumerate() {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitNotFound {
                    qubit: *qubit,
                    gate_name: gate_name(),
                });
            }
            if instruction.qubits[..i].contains(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit: *qubit,
                    gate_name: gate_name(),
                });
            }
        }

        if let Some(clbit) = instruction.clbits.iter().find(|c| c.0 >= self.num_clbits) {
            return Err(IrError::ClbitNotFound { clbit: *clbit });
        }

        if instruction.is_measure() && instruction.qubits.len() != instruction.clbits.len() {
            return Err(IrError::MeasureArity {
                qubits: instruction.qubits.len(),
                clbits: instruction.clbits.len(),
            });
        }

        Ok(())
    }

    fn single(&mut self, gate: StandardGate, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(gate, qubit))
    }

    fn pair(&mut self, gate: StandardGate, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(gate, a, b))
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::H, qubit)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::X, qubit)
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Y, qubit)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Z, qubit)
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::S, qubit)
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Sdg, qubit)
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::T, qubit)
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Tdg, qubit)
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::SX, qubit)
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Rx(theta), qubit)
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Ry(theta), qubit)
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::Rz(theta), qubit)
    }

    /// Apply phase gate.
    pub fn p(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::P(theta), qubit)
    }

    /// Apply universal U gate.
    pub fn u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.single(StandardGate::U(theta, phi, lambda), qubit)
    }

    // =========================================================================
    // Multi-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::CX, control, target)
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::CY, control, target)
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::CZ, control, target)
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::CH, control, target)
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::Swap, q1, q2)
    }

    /// Apply iSWAP gate.
    pub fn iswap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::ISwap, q1, q2)
    }

    /// Apply controlled-Rz gate.
    pub fn crz(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::CRz(theta), control, target)
    }

    /// Apply controlled-phase gate.
    pub fn cp(&mut self, theta: f64, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.pair(StandardGate::CP(theta), control, target)
    }

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(StandardGate::CCX, [c1, c2, target]))
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(StandardGate::CSwap, [control, t1, t2]))
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.apply(Instruction::measure(qubit, clbit))
    }

    /// Measure every qubit into the classical bit with the same index.
    ///
    /// Classical bits are added as needed.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        while self.num_clbits < self.num_qubits {
            self.add_clbit();
        }
        let instruction = Instruction::measure_many(
            (0..self.num_qubits).map(QubitId),
            (0..self.num_qubits).map(ClbitId),
        )?;
        self.apply(instruction)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::reset(qubit))
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.apply(Instruction::barrier(qubits))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// Get the instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions, barriers included.
    pub fn num_ops(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the circuit contains at least one measurement.
    pub fn has_measurements(&self) -> bool {
        self.instructions.iter().any(Instruction::is_measure)
    }

    /// Qubits that are measured, in order of first measurement.
    pub fn measured_qubits(&self) -> Vec<QubitId> {
        let mut seen = Vec::new();
        for inst in self.instructions.iter().filter(|i| i.is_measure()) {
            for q in &inst.qubits {
                if !seen.contains(q) {
                    seen.push(*q);
                }
            }
        }
        seen
    }

    /// Circuit depth: the longest chain of instructions sharing a wire.
    ///
    /// Barriers synchronise their qubits but do not add a layer.
    pub fn depth(&self) -> usize {
        let mut qubit_layer = vec![0usize; self.num_qubits()];
        let mut clbit_layer = vec![0usize; self.num_clbits()];
        let mut depth = 0;

        for inst in &self.instructions {
            let start = inst
                .qubits
                .iter()
                .map(|q| qubit_layer[q.index()])
                .chain(inst.clbits.iter().map(|c| clbit_layer[c.index()]))
                .max()
                .unwrap_or(0);
            let end = if matches!(inst.kind, InstructionKind::Barrier) {
                start
            } else {
                start + 1
            };
            for q in &inst.qubits {
                qubit_layer[q.index()] = end;
            }
            for c in &inst.clbits {
                clbit_layer[c.index()] = end;
            }
            depth = depth.max(end);
        }

        depth
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit
            .h(QubitId(0))?
            .cx(QubitId(0), QubitId(1))?
            .measure(QubitId(0), ClbitId(0))?
            .measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }

        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_new_circuit() {
        let circuit = Circuit::new("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.num_qubits(), 0);
        assert_eq!(circuit.num_clbits(), 0);
        assert_eq!(circuit.depth(), 0);
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.depth(), 3); // H, CX, parallel measures
        assert_eq!(circuit.measured_qubits(), vec![QubitId(0), QubitId(1)]);
    }

    #[test]
    fn test_ghz_state() {
        let circuit = Circuit::ghz(5).unwrap();
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.num_ops(), 1 + 4 + 5);
        assert!(circuit.has_measurements());
    }

    #[test]
    fn test_measure_all_adds_clbits() {
        let mut circuit = Circuit::with_size("m", 3, 0);
        circuit.h(QubitId(0)).unwrap().measure_all().unwrap();
        assert_eq!(circuit.num_clbits(), 3);
        assert_eq!(circuit.measured_qubits().len(), 3);
    }

    #[test]
    fn test_measured_qubits_first_occurrence_order() {
        let mut circuit = Circuit::with_size("m", 3, 3);
        circuit
            .measure(QubitId(2), ClbitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(1))
            .unwrap()
            .measure(QubitId(2), ClbitId(2))
            .unwrap();
        assert_eq!(circuit.measured_qubits(), vec![QubitId(2), QubitId(0)]);
    }

    #[test]
    fn test_rejects_unknown_qubit() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        let err = circuit.cx(QubitId(0), QubitId(1)).unwrap_err();
        assert!(matches!(err, IrError::QubitNotFound { qubit: QubitId(1), .. }));
    }

    #[test]
    fn test_rejects_duplicate_qubit() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        let err = circuit.cx(QubitId(1), QubitId(1)).unwrap_err();
        assert!(matches!(err, IrError::DuplicateQubit { .. }));
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        let err = circuit
            .apply(Instruction::gate(StandardGate::H, [QubitId(0), QubitId(1)]))
            .unwrap_err();
        assert!(matches!(
            err,
            IrError::QubitCountMismatch {
                expected: 1,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_reset_takes_exactly_one_qubit() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        for qubits in [vec![], vec![QubitId(0), QubitId(1)]] {
            let err = circuit
                .apply(Instruction {
                    kind: InstructionKind::Reset,
                    qubits,
                    clbits: vec![],
                })
                .unwrap_err();
            assert!(matches!(
                err,
                IrError::QubitCountMismatch { expected: 1, .. }
            ));
        }
        assert_eq!(circuit.num_ops(), 0);
        assert!(circuit.reset(QubitId(1)).is_ok());
    }

    #[test]
    fn test_rejects_unknown_clbit() {
        let mut circuit = Circuit::with_size("test", 1, 1);
        let err = circuit.measure(QubitId(0), ClbitId(3)).unwrap_err();
        assert!(matches!(err, IrError::ClbitNotFound { .. }));
    }

    #[test]
    fn test_fluent_api_and_depth() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit
            .rx(PI / 2.0, QubitId(0))
            .unwrap()
            .ry(PI, QubitId(1))
            .unwrap()
            .barrier([QubitId(0), QubitId(1)])
            .unwrap()
            .cz(QubitId(0), QubitId(1))
            .unwrap();
        assert_eq!(circuit.depth(), 2);
    }

    #[test]
    fn test_serde_roundtrip_preserves_instructions() {
        let circuit = Circuit::bell().unwrap();
        let json = serde_json::to_string(&circuit).unwrap();
        let back: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, circuit);
    }

    proptest::proptest! {
        #[test]
        fn prop_measured_qubits_follow_first_measurement(
            order in proptest::collection::vec(0u32..6, 0..24)
        ) {
            let mut circuit = Circuit::with_size("m", 6, 6);
            for q in &order {
                circuit.measure(QubitId(*q), ClbitId(*q)).unwrap();
            }

            let mut expected: Vec<QubitId> = Vec::new();
            for q in order.iter().map(|q| QubitId(*q)) {
                if !expected.contains(&q) {
                    expected.push(q);
                }
            }
            proptest::prop_assert_eq!(circuit.measured_qubits(), expected);
        }
    }
}
