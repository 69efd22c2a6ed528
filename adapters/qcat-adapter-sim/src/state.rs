//! Statevector simulation engine.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;
use rand::Rng;

use qcat_ir::StandardGate;

type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

const X: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
const Y: Matrix2 = [[ZERO, Complex64::new(0.0, -1.0)], [I, ZERO]];
const Z: Matrix2 = [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]];
const H: Matrix2 = [
    [
        Complex64::new(FRAC_1_SQRT_2, 0.0),
        Complex64::new(FRAC_1_SQRT_2, 0.0),
    ],
    [
        Complex64::new(FRAC_1_SQRT_2, 0.0),
        Complex64::new(-FRAC_1_SQRT_2, 0.0),
    ],
];
const SX: Matrix2 = [
    [Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5)],
    [Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5)],
];

fn phase(theta: f64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, theta)]]
}

fn rx(theta: f64) -> Matrix2 {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new(0.0, -(theta / 2.0).sin());
    [[c, s], [s, c]]
}

fn ry(theta: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
    ]
}

fn rz(theta: f64) -> Matrix2 {
    [
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
    ]
}

fn u(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), -Complex64::from_polar(s, lambda)],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ],
    ]
}

/// The state of an `n`-qubit register. Amplitude index bit `i` is qubit `i`.
#[derive(Debug, Clone)]
pub(crate) struct QuantumState {
    amplitudes: Vec<Complex64>,
}

impl QuantumState {
    /// |0...0⟩ on `num_qubits` qubits.
    pub(crate) fn new(num_qubits: usize) -> Self {
        let mut amplitudes = vec![ZERO; 1 << num_qubits];
        amplitudes[0] = ONE;
        Self { amplitudes }
    }

    pub(crate) fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub(crate) fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Apply `gate` to `qubits`, in the operand order of the instruction.
    pub(crate) fn apply_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match gate {
            StandardGate::I => {}
            StandardGate::X => self.apply_1q(qubits[0], 0, &X),
            StandardGate::Y => self.apply_1q(qubits[0], 0, &Y),
            StandardGate::Z => self.apply_1q(qubits[0], 0, &Z),
            StandardGate::H => self.apply_1q(qubits[0], 0, &H),
            StandardGate::S => self.apply_1q(qubits[0], 0, &phase(PI / 2.0)),
            StandardGate::Sdg => self.apply_1q(qubits[0], 0, &phase(-PI / 2.0)),
            StandardGate::T => self.apply_1q(qubits[0], 0, &phase(PI / 4.0)),
            StandardGate::Tdg => self.apply_1q(qubits[0], 0, &phase(-PI / 4.0)),
            StandardGate::SX => self.apply_1q(qubits[0], 0, &SX),
            StandardGate::Rx(theta) => self.apply_1q(qubits[0], 0, &rx(*theta)),
            StandardGate::Ry(theta) => self.apply_1q(qubits[0], 0, &ry(*theta)),
            StandardGate::Rz(theta) => self.apply_1q(qubits[0], 0, &rz(*theta)),
            StandardGate::P(theta) => self.apply_1q(qubits[0], 0, &phase(*theta)),
            StandardGate::U(theta, phi, lambda) => {
                self.apply_1q(qubits[0], 0, &u(*theta, *phi, *lambda));
            }

            StandardGate::CX => self.apply_1q(qubits[1], 1 << qubits[0], &X),
            StandardGate::CY => self.apply_1q(qubits[1], 1 << qubits[0], &Y),
            StandardGate::CZ => self.apply_1q(qubits[1], 1 << qubits[0], &Z),
            StandardGate::CH => self.apply_1q(qubits[1], 1 << qubits[0], &H),
            StandardGate::CRz(theta) => self.apply_1q(qubits[1], 1 << qubits[0], &rz(*theta)),
            StandardGate::CP(theta) => self.apply_1q(qubits[1], 1 << qubits[0], &phase(*theta)),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1], 0, ONE),
            StandardGate::ISwap => self.apply_swap(qubits[0], qubits[1], 0, I),

            StandardGate::CCX => {
                self.apply_1q(qubits[2], (1 << qubits[0]) | (1 << qubits[1]), &X);
            }
            StandardGate::CSwap => self.apply_swap(qubits[1], qubits[2], 1 << qubits[0], ONE),
        }
    }

    /// Apply a 2x2 unitary to `target` on the subspace where every bit of
    /// `controls` is set.
    fn apply_1q(&mut self, target: usize, controls: usize, m: &Matrix2) {
        let mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 && i & controls == controls {
                let j = i | mask;
                let (a, b) = (self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    /// Exchange |01⟩ and |10⟩ of `(q1, q2)`, multiplying both by `factor`.
    fn apply_swap(&mut self, q1: usize, q2: usize, controls: usize, factor: Complex64) {
        let (m1, m2) = (1 << q1, 1 << q2);
        for i in 0..self.amplitudes.len() {
            if i & m1 != 0 && i & m2 == 0 && i & controls == controls {
                let j = (i & !m1) | m2;
                let (a, b) = (self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = factor * b;
                self.amplitudes[j] = factor * a;
            }
        }
    }

    /// Probability of reading `1` on `qubit`.
    fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }

    /// Projective measurement of one qubit. The state collapses.
    pub(crate) fn measure<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> bool {
        let p1 = self.probability_one(qubit);
        let value = rng.r#gen::<f64>() < p1;
        let p = if value { p1 } else { 1.0 - p1 };
        let scale = if p > 0.0 { 1.0 / p.sqrt() } else { 0.0 };

        let mask = 1 << qubit;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == value {
                *amp *= scale;
            } else {
                *amp = ZERO;
            }
        }
        value
    }

    /// Measure, then flip back to |0⟩ if the qubit read `1`.
    pub(crate) fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        if self.measure(qubit, rng) {
            self.apply_1q(qubit, 0, &X);
        }
    }

    /// Cumulative distribution over basis states for repeated sampling.
    pub(crate) fn sampler(&self) -> Sampler {
        let mut total = 0.0;
        let cumulative = self
            .amplitudes
            .iter()
            .map(|amp| {
                total += amp.norm_sqr();
                total
            })
            .collect();
        Sampler { cumulative }
    }
}

/// Draws full-register outcomes from a fixed distribution.
pub(crate) struct Sampler {
    cumulative: Vec<f64>,
}

impl Sampler {
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        let r = rng.r#gen::<f64>() * total;
        let idx = self.cumulative.partition_point(|&c| c <= r);
        idx.min(self.cumulative.len().saturating_sub(1)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn state_after(num_qubits: usize, gates: &[(StandardGate, &[usize])]) -> QuantumState {
        let mut state = QuantumState::new(num_qubits);
        for (gate, qubits) in gates {
            state.apply_gate(gate, qubits);
        }
        state
    }

    #[test]
    fn test_initial_state() {
        let state = QuantumState::new(2);
        assert!(approx_eq(state.amplitudes()[0], ONE));
        assert!(state.amplitudes()[1..].iter().all(|a| approx_eq(*a, ZERO)));
    }

    #[test]
    fn test_bell_state() {
        let state = state_after(2, &[(StandardGate::H, &[0]), (StandardGate::CX, &[0, 1])]);
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        assert!(approx_eq(state.amplitudes()[0b00], h));
        assert!(approx_eq(state.amplitudes()[0b01], ZERO));
        assert!(approx_eq(state.amplitudes()[0b10], ZERO));
        assert!(approx_eq(state.amplitudes()[0b11], h));
    }

    #[test]
    fn test_x_sets_low_bit_for_qubit_zero() {
        let state = state_after(2, &[(StandardGate::X, &[0])]);
        assert!(approx_eq(state.amplitudes()[0b01], ONE));
    }

    #[test]
    fn test_controlled_gate_uses_first_operand_as_control() {
        let state = state_after(2, &[(StandardGate::X, &[1]), (StandardGate::CX, &[1, 0])]);
        assert!(approx_eq(state.amplitudes()[0b11], ONE));

        let untouched = state_after(2, &[(StandardGate::CX, &[1, 0])]);
        assert!(approx_eq(untouched.amplitudes()[0b00], ONE));
    }

    #[test]
    fn test_swap_and_cswap() {
        let swapped = state_after(2, &[(StandardGate::X, &[0]), (StandardGate::Swap, &[0, 1])]);
        assert!(approx_eq(swapped.amplitudes()[0b10], ONE));

        let idle = state_after(3, &[(StandardGate::X, &[1]), (StandardGate::CSwap, &[0, 1, 2])]);
        assert!(approx_eq(idle.amplitudes()[0b010], ONE));

        let fired = state_after(
            3,
            &[
                (StandardGate::X, &[0]),
                (StandardGate::X, &[1]),
                (StandardGate::CSwap, &[0, 1, 2]),
            ],
        );
        assert!(approx_eq(fired.amplitudes()[0b101], ONE));
    }

    #[test]
    fn test_iswap_phase() {
        let state = state_after(2, &[(StandardGate::X, &[0]), (StandardGate::ISwap, &[0, 1])]);
        assert!(approx_eq(state.amplitudes()[0b10], I));
    }

    #[test]
    fn test_sx_squared_is_x() {
        let state = state_after(1, &[(StandardGate::SX, &[0]), (StandardGate::SX, &[0])]);
        assert!(approx_eq(state.amplitudes()[1], ONE));
    }

    #[test]
    fn test_ccx() {
        let state = state_after(
            3,
            &[
                (StandardGate::X, &[0]),
                (StandardGate::X, &[1]),
                (StandardGate::CCX, &[0, 1, 2]),
            ],
        );
        assert!(approx_eq(state.amplitudes()[0b111], ONE));
    }

    #[test]
    fn test_rotations_preserve_norm() {
        let state = state_after(
            2,
            &[
                (StandardGate::Rx(0.3), &[0]),
                (StandardGate::Ry(1.1), &[1]),
                (StandardGate::U(0.4, 0.2, -0.7), &[0]),
                (StandardGate::CRz(2.0), &[0, 1]),
                (StandardGate::CP(0.9), &[1, 0]),
            ],
        );
        let norm: f64 = state.amplitudes().iter().map(Complex64::norm_sqr).sum();
        assert!((norm - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_measure_collapses() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = state_after(2, &[(StandardGate::H, &[0]), (StandardGate::CX, &[0, 1])]);
        let first = state.measure(0, &mut rng);
        let second = state.measure(1, &mut rng);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = state_after(1, &[(StandardGate::H, &[0])]);
        state.reset(0, &mut rng);
        assert!((state.amplitudes()[0].norm_sqr() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_sample_deterministic() {
        let mut rng = StdRng::seed_from_u64(0);
        let sampler = state_after(3, &[(StandardGate::X, &[2])]).sampler();
        for _ in 0..100 {
            assert_eq!(sampler.sample(&mut rng), 0b100);
        }
    }
}
