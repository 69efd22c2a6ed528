//! Lowering of qcat circuits to the `ionq.circuit.v0` gate list.
//!
//! | qcat gate | IonQ gate |
//! |-----------|-----------|
//! | `x y z h s t` | same name |
//! | `sdg`, `tdg`, `sx` | `si`, `ti`, `v` |
//! | `rx ry rz` | same name with `rotation` |
//! | `cx cy cz ch crz` | base gate with one control |
//! | `ccx` | `x` with two controls |
//! | `swap` | `swap` on two targets |
//!
//! IonQ measures every qubit at the end of a job, so measurements and
//! barriers are dropped. Resets cannot be expressed.

use qcat_ir::{Circuit, InstructionKind, QubitId, StandardGate};

use crate::api::IonqGate;
use crate::error::{IonqError, IonqResult};

/// Serialize `circuit` into IonQ gates.
pub fn serialize(circuit: &Circuit) -> IonqResult<Vec<IonqGate>> {
    let mut gates = Vec::with_capacity(circuit.num_ops());

    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => gates.push(lower_gate(gate, &inst.qubits)?),
            InstructionKind::Measure | InstructionKind::Barrier => {}
            InstructionKind::Reset => return Err(IonqError::UnsupportedGate("reset".into())),
        }
    }

    Ok(gates)
}

fn lower_gate(gate: &StandardGate, qubits: &[QubitId]) -> IonqResult<IonqGate> {
    let idx: Vec<u32> = qubits.iter().map(|q| q.0).collect();
    let single = |name: &'static str, rotation: Option<f64>| IonqGate {
        gate: name,
        targets: vec![idx[0]],
        controls: vec![],
        rotation,
    };
    let controlled = |name: &'static str, rotation: Option<f64>| IonqGate {
        gate: name,
        targets: vec![idx[idx.len() - 1]],
        controls: idx[..idx.len() - 1].to_vec(),
        rotation,
    };

    if idx.len() != gate.num_qubits() as usize {
        return Err(IonqError::UnsupportedGate(format!(
            "{} on {} qubits",
            gate.name(),
            idx.len()
        )));
    }

    let lowered = match *gate {
        StandardGate::X => single("x", None),
        StandardGate::Y => single("y", None),
        StandardGate::Z => single("z", None),
        StandardGate::H => single("h", None),
        StandardGate::S => single("s", None),
        StandardGate::Sdg => single("si", None),
        StandardGate::T => single("t", None),
        StandardGate::Tdg => single("ti", None),
        StandardGate::SX => single("v", None),
        StandardGate::Rx(theta) => single("rx", Some(theta)),
        StandardGate::Ry(theta) => single("ry", Some(theta)),
        StandardGate::Rz(theta) => single("rz", Some(theta)),
        StandardGate::CX | StandardGate::CCX => controlled("x", None),
        StandardGate::CY => controlled("y", None),
        StandardGate::CZ => controlled("z", None),
        StandardGate::CH => controlled("h", None),
        StandardGate::CRz(theta) => controlled("rz", Some(theta)),
        StandardGate::Swap => IonqGate {
            gate: "swap",
            targets: idx.clone(),
            controls: vec![],
            rotation: None,
        },
        _ => return Err(IonqError::UnsupportedGate(gate.name().to_string())),
    };

    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_bell_drops_measurements() {
        let gates = serialize(&Circuit::bell().unwrap()).unwrap();
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].gate, "h");
        assert_eq!(gates[0].targets, vec![0]);
        assert_eq!(gates[1].gate, "x");
        assert_eq!(gates[1].controls, vec![0]);
        assert_eq!(gates[1].targets, vec![1]);
    }

    #[test]
    fn test_renamed_gates() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit
            .sdg(QubitId(0))
            .unwrap()
            .tdg(QubitId(0))
            .unwrap()
            .sx(QubitId(0))
            .unwrap();
        let names: Vec<_> = serialize(&circuit).unwrap().iter().map(|g| g.gate).collect();
        assert_eq!(names, vec!["si", "ti", "v"]);
    }

    #[test]
    fn test_rotation_and_toffoli() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.ry(FRAC_PI_2, QubitId(2)).unwrap();
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        circuit.swap(QubitId(0), QubitId(2)).unwrap();

        let gates = serialize(&circuit).unwrap();
        assert_eq!(gates[0].rotation, Some(FRAC_PI_2));
        assert_eq!(gates[1].controls, vec![0, 1]);
        assert_eq!(gates[1].targets, vec![2]);
        assert_eq!(gates[2].targets, vec![0, 2]);
    }

    #[test]
    fn test_unsupported_gates() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.cswap(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        assert!(matches!(
            serialize(&circuit),
            Err(IonqError::UnsupportedGate(name)) if name == "cswap"
        ));

        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit.reset(QubitId(0)).unwrap();
        assert!(serialize(&circuit).is_err());
    }
}
