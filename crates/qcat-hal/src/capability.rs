//! Backend capability introspection.
//!
//! Describes what an execution engine can run: qubit count, supported gates
//! (OpenQASM 3 names), shot limits and feature flags such as
//! `"statevector"` or `"mid_circuit_measurement"`.

use serde::{Deserialize, Serialize};

use qcat_ir::Circuit;

use crate::backend::ValidationResult;

/// Hardware capabilities of a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Supported gate set (OpenQASM 3 naming convention).
    pub gate_set: GateSet,
    /// Maximum number of shots per job.
    pub max_shots: u32,
    /// Whether this is a simulator (`true`) or real hardware (`false`).
    pub is_simulator: bool,
    /// Additional capability flags: `"statevector"`,
    /// `"mid_circuit_measurement"`, `"ion_trap"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Create capabilities for the local statevector simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            gate_set: GateSet::universal(),
            max_shots: 1_000_000,
            is_simulator: true,
            features: vec!["statevector".into(), "mid_circuit_measurement".into()],
        }
    }

    /// Create capabilities for an IBM Quantum device.
    ///
    /// The sampler accepts any `stdgates.inc` gate and transpiles server
    /// side, so the full universal set is advertised.
    pub fn ibm(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::universal(),
            max_shots: 100_000,
            is_simulator: false,
            features: vec!["mid_circuit_measurement".into()],
        }
    }

    /// Create capabilities for an IonQ target.
    pub fn ionq(name: impl Into<String>, num_qubits: u32, is_simulator: bool) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::ionq(),
            max_shots: 10_000,
            is_simulator,
            features: vec!["ion_trap".into()],
        }
    }

    /// Check whether a feature flag is advertised.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Check a circuit's width and gates against these capabilities.
    pub fn check(&self, circuit: &Circuit) -> ValidationResult {
        let mut reasons = Vec::new();

        if circuit.num_qubits() > self.num_qubits as usize {
            reasons.push(format!(
                "Circuit has {} qubits but {} supports at most {}",
                circuit.num_qubits(),
                self.name,
                self.num_qubits
            ));
        }

        for instruction in circuit.instructions() {
            if let Some(gate) = instruction.as_gate() {
                let name = gate.name();
                if !self.gate_set.contains(name) {
                    let reason = format!("Unsupported gate: {name}");
                    if !reasons.contains(&reason) {
                        reasons.push(reason);
                    }
                }
            }
        }

        if reasons.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { reasons }
        }
    }
}

/// Gate set supported by a backend.
///
/// Gate names follow the OpenQASM 3 naming convention (lowercase).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-qubit gates supported.
    pub single_qubit: Vec<String>,
    /// Two-qubit gates supported.
    pub two_qubit: Vec<String>,
    /// Three-qubit gates supported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub three_qubit: Vec<String>,
}

impl GateSet {
    /// Every gate of the IR.
    pub fn universal() -> Self {
        Self {
            single_qubit: names(&[
                "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "rx", "ry", "rz", "p", "u",
            ]),
            two_qubit: names(&["cx", "cy", "cz", "ch", "swap", "iswap", "crz", "cp"]),
            three_qubit: names(&["ccx", "cswap"]),
        }
    }

    /// Gates expressible in the `ionq.circuit.v0` format.
    ///
    /// Controlled gates map to a base gate with `controls`.
    pub fn ionq() -> Self {
        Self {
            single_qubit: names(&[
                "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "rx", "ry", "rz",
            ]),
            two_qubit: names(&["cx", "cy", "cz", "ch", "swap", "crz"]),
            three_qubit: names(&["ccx"]),
        }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate)
            || self.two_qubit.iter().any(|g| g == gate)
            || self.three_qubit.iter().any(|g| g == gate)
    }
}

fn names(gates: &[&str]) -> Vec<String> {
    gates.iter().map(|g| (*g).to_string()).collect()
}
