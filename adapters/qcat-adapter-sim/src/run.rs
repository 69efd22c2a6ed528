//! Shot execution over a circuit.

use rand::Rng;
use rustc_hash::FxHashMap;

use qcat_hal::{Counts, HalResult, Outcomes};
use qcat_ir::{Circuit, InstructionKind};

use crate::state::QuantumState;

/// Counts of one run: joint outcomes plus the classical register.
pub(crate) struct ShotTally {
    pub(crate) outcomes: Outcomes,
    pub(crate) counts: Counts,
}

/// True when no gate or reset touches a qubit after it was measured.
///
/// Such circuits can be simulated once and sampled.
pub(crate) fn measurements_are_terminal(circuit: &Circuit) -> bool {
    let mut measured = vec![false; circuit.num_qubits()];
    for inst in circuit.instructions() {
        match inst.kind {
            InstructionKind::Measure => {
                for q in &inst.qubits {
                    measured[q.index()] = true;
                }
            }
            InstructionKind::Reset => return false,
            InstructionKind::Gate(_) => {
                if inst.qubits.iter().any(|q| measured[q.index()]) {
                    return false;
                }
            }
            InstructionKind::Barrier => {}
        }
    }
    true
}

/// Evolve |0...0⟩ through every gate. Measurements are skipped.
pub(crate) fn evolve<R: Rng + ?Sized>(circuit: &Circuit, rng: &mut R) -> QuantumState {
    let mut state = QuantumState::new(circuit.num_qubits());
    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
                state.apply_gate(gate, &qubits);
            }
            InstructionKind::Reset => state.reset(inst.qubits[0].index(), rng),
            InstructionKind::Measure | InstructionKind::Barrier => {}
        }
    }
    state
}

/// Run `shots` executions of `circuit`.
pub(crate) fn run_shots<R: Rng + ?Sized>(
    circuit: &Circuit,
    shots: u32,
    rng: &mut R,
) -> HalResult<ShotTally> {
    let mut outcomes = Outcomes::new(circuit.num_qubits())?;
    let mut counts = Counts::new();

    if shots == 0 {
        return Ok(ShotTally { outcomes, counts });
    }

    if measurements_are_terminal(circuit) {
        let sampler = evolve(circuit, rng).sampler();
        let mut tally: FxHashMap<u64, u64> = FxHashMap::default();
        for _ in 0..shots {
            *tally.entry(sampler.sample(rng)).or_insert(0) += 1;
        }
        for (outcome, count) in tally {
            outcomes.record(outcome, count);
            counts.insert(classical_key(circuit, outcome), count);
        }
    } else {
        for _ in 0..shots {
            let (outcome, clbits) = run_single_shot(circuit, rng);
            outcomes.record(outcome, 1);
            counts.insert(bits_to_key(&clbits), 1);
        }
    }

    Ok(ShotTally { outcomes, counts })
}

/// One shot with measurement collapse.
///
/// Measured qubits report their last measurement; the rest are read from
/// the final state.
fn run_single_shot<R: Rng + ?Sized>(circuit: &Circuit, rng: &mut R) -> (u64, Vec<bool>) {
    let mut state = QuantumState::new(circuit.num_qubits());
    let mut clbits = vec![false; circuit.num_clbits()];
    let mut measured_mask = 0u64;
    let mut measured_values = 0u64;

    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
                state.apply_gate(gate, &qubits);
            }
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    let bit = 1u64 << q.index();
                    let value = state.measure(q.index(), rng);
                    clbits[c.index()] = value;
                    measured_mask |= bit;
                    if value {
                        measured_values |= bit;
                    } else {
                        measured_values &= !bit;
                    }
                }
            }
            InstructionKind::Reset => state.reset(inst.qubits[0].index(), rng),
            InstructionKind::Barrier => {}
        }
    }

    let rest = state.sampler().sample(rng);
    ((rest & !measured_mask) | measured_values, clbits)
}

/// Classical-register key of a full-register outcome.
///
/// Circuits without classical bits are keyed on the whole register.
fn classical_key(circuit: &Circuit, outcome: u64) -> String {
    if circuit.num_clbits() == 0 {
        let bits: Vec<bool> = (0..circuit.num_qubits())
            .map(|q| (outcome >> q) & 1 == 1)
            .collect();
        return bits_to_key(&bits);
    }

    let mut clbits = vec![false; circuit.num_clbits()];
    for inst in circuit.instructions().iter().filter(|i| i.is_measure()) {
        for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
            clbits[c.index()] = (outcome >> q.index()) & 1 == 1;
        }
    }
    bits_to_key(&clbits)
}

/// Highest index leftmost.
fn bits_to_key(bits: &[bool]) -> String {
    bits.iter().rev().map(|&b| if b { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_ir::{ClbitId, QubitId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_terminal_detection() {
        let bell = Circuit::bell().unwrap();
        assert!(measurements_are_terminal(&bell));

        let mut mid = Circuit::with_size("mid", 1, 1);
        mid.h(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .h(QubitId(0))
            .unwrap();
        assert!(!measurements_are_terminal(&mid));

        let mut with_reset = Circuit::with_size("reset", 1, 0);
        with_reset.reset(QubitId(0)).unwrap();
        assert!(!measurements_are_terminal(&with_reset));
    }

    #[test]
    fn test_classical_key_highest_clbit_leftmost() {
        let mut circuit = Circuit::with_size("x", 2, 2);
        circuit
            .x(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let tally = run_shots(&circuit, 50, &mut rng).unwrap();
        assert_eq!(tally.counts.get("01"), 50);
        assert_eq!(tally.outcomes.register_histogram().get("10"), 50);
    }

    #[test]
    fn test_crossed_measurement_mapping() {
        let mut circuit = Circuit::with_size("crossed", 2, 2);
        circuit
            .x(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(1))
            .unwrap()
            .measure(QubitId(1), ClbitId(0))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        let tally = run_shots(&circuit, 10, &mut rng).unwrap();
        assert_eq!(tally.counts.get("10"), 10);
    }

    #[test]
    fn test_mid_circuit_measurement_reports_measured_value() {
        // Measure |1⟩, then flip: the record keeps the measured 1.
        let mut circuit = Circuit::with_size("mid", 1, 1);
        circuit
            .x(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .x(QubitId(0))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let tally = run_shots(&circuit, 20, &mut rng).unwrap();
        assert_eq!(tally.counts.get("1"), 20);
        assert_eq!(tally.outcomes.register_histogram().get("1"), 20);
    }

    #[test]
    fn test_zero_shots_is_empty() {
        let mut rng = StdRng::seed_from_u64(0);
        let tally = run_shots(&Circuit::bell().unwrap(), 0, &mut rng).unwrap();
        assert!(tally.counts.is_empty());
        assert!(tally.outcomes.is_empty());
    }

    #[test]
    fn test_unmeasured_circuit_keyed_on_register() {
        let mut circuit = Circuit::with_size("plain", 3, 0);
        circuit.x(QubitId(2)).unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        let tally = run_shots(&circuit, 4, &mut rng).unwrap();
        assert_eq!(tally.counts.get("100"), 4);
    }
}
