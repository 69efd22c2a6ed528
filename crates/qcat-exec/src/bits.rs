//! Measurement keys and bit-order conventions.
//!
//! Histograms built here put the first measured qubit leftmost, the order
//! Cirq and IonQ report. The IBM convention is the reverse (highest bit
//! leftmost); [`Counts::reversed`] converts between the two.

use qcat_hal::{Counts, Outcomes};
use qcat_ir::{Instruction, QubitId};

/// Qubits measured by `operations`, in order of first measurement.
pub fn measured_qubits(operations: &[Instruction]) -> Vec<QubitId> {
    let mut seen = Vec::new();
    for inst in operations.iter().filter(|inst| inst.is_measure()) {
        for q in &inst.qubits {
            if !seen.contains(q) {
                seen.push(*q);
            }
        }
    }
    seen
}

/// Histogram of `outcomes` keyed the way measurement keys are read.
///
/// With measurements in `operations` the key is the joint value of the
/// measured qubits, first measured leftmost. Without any, the whole
/// register is read with qubit 0 leftmost.
pub fn keyed_histogram(outcomes: &Outcomes, operations: &[Instruction]) -> Counts {
    let keys = measured_qubits(operations);
    if keys.is_empty() {
        outcomes.register_histogram()
    } else {
        outcomes.histogram(&keys)
    }
}

/// Apply the bit-reversal transform when `reverse` is set.
pub fn oriented(counts: Counts, reverse: bool) -> Counts {
    if reverse { counts.reversed() } else { counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qcat_ir::{Circuit, ClbitId};

    #[test]
    fn test_measured_qubits_dedup_in_order() {
        let mut circuit = Circuit::with_size("m", 3, 3);
        circuit.measure(QubitId(2), ClbitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(1)).unwrap();
        circuit.measure(QubitId(2), ClbitId(2)).unwrap();
        assert_eq!(
            measured_qubits(circuit.instructions()),
            vec![QubitId(2), QubitId(0)]
        );
    }

    #[test]
    fn test_keyed_histogram_joint_keys() {
        let mut circuit = Circuit::with_size("m", 3, 2);
        circuit.measure(QubitId(2), ClbitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(1)).unwrap();

        let mut outcomes = Outcomes::new(3).unwrap();
        // q2 = 1, q0 = 0
        outcomes.record(0b100, 4);
        let counts = keyed_histogram(&outcomes, circuit.instructions());
        assert_eq!(counts.get("10"), 4);
    }

    #[test]
    fn test_keyed_histogram_without_measurements() {
        let mut outcomes = Outcomes::new(3).unwrap();
        outcomes.record(0b001, 2);
        let counts = keyed_histogram(&outcomes, &[]);
        assert_eq!(counts.get("100"), 2);
    }

    #[test]
    fn test_raw_key_reversed() {
        let mut counts = Counts::new();
        counts.insert("011", 5);
        let reversed = oriented(counts.clone(), true);
        assert_eq!(reversed.get("110"), 5);
        assert_eq!(oriented(counts, false).get("011"), 5);
    }

    proptest! {
        #[test]
        fn prop_oriented_keys_are_reversed_raw_keys(
            raw in proptest::collection::btree_map(0u64..64, 1u64..100, 1..20),
        ) {
            let mut outcomes = Outcomes::new(6).unwrap();
            for (&outcome, &count) in &raw {
                outcomes.record(outcome, count);
            }
            let plain = keyed_histogram(&outcomes, &[]);
            let flipped = oriented(plain.clone(), true);

            prop_assert_eq!(plain.total_shots(), flipped.total_shots());
            for (key, &count) in plain.iter() {
                let expected: String = key.chars().rev().collect();
                prop_assert_eq!(flipped.get(&expected), count);
            }
        }
    }
}
