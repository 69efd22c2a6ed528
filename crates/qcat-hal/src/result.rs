//! Execution result types.
//!
//! - [`Counts`]: histogram keyed by bitstring.
//! - [`Outcomes`]: joint histogram of full-register outcomes, keyed by the
//!   outcome integer (bit `i` = qubit `i`). Engines that sample the whole
//!   register produce it; measurement-key histograms are derived from it.
//! - [`Statevector`]: dense amplitudes, index bit `i` = qubit `i`.

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use qcat_ir::QubitId;

use crate::error::{HalError, HalResult};

/// Widest register an [`Outcomes`] histogram can key.
pub const MAX_OUTCOME_QUBITS: usize = 64;

/// Measurement counts keyed by bitstring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts {
    counts: BTreeMap<String, u64>,
}

impl Counts {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `bitstring`.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_insert(0) += count;
    }

    /// Occurrences of `bitstring` (0 if never seen).
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The most frequent bitstring. Ties resolve to the smallest key.
    pub fn most_frequent(&self) -> Option<(&String, u64)> {
        self.counts
            .iter()
            .fold(None, |best: Option<(&String, u64)>, (key, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((key, count)),
            })
    }

    /// Iterate `(bitstring, count)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.counts.iter()
    }

    /// Bitstrings observed, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.counts.keys()
    }

    /// Number of distinct bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Relabel every key. Keys that collide are merged.
    #[must_use]
    pub fn map_keys(&self, mut f: impl FnMut(&str) -> String) -> Self {
        let mut out = Self::new();
        for (key, &count) in &self.counts {
            out.insert(f(key), count);
        }
        out
    }

    /// Every key with its characters in reverse order.
    #[must_use]
    pub fn reversed(&self) -> Self {
        self.map_keys(|key| key.chars().rev().collect())
    }

    /// Relative frequencies.
    pub fn probabilities(&self) -> BTreeMap<String, f64> {
        let total = self.total_shots();
        if total == 0 {
            return BTreeMap::new();
        }
        self.counts
            .iter()
            .map(|(key, &count)| (key.clone(), count as f64 / total as f64))
            .collect()
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, u64> {
        self.counts
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (key, count) in iter {
            counts.insert(key, count);
        }
        counts
    }
}

impl IntoIterator for Counts {
    type Item = (String, u64);
    type IntoIter = std::collections::btree_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

/// Joint histogram of full-register measurement outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcomes {
    num_qubits: usize,
    counts: BTreeMap<u64, u64>,
}

impl Outcomes {
    /// Create an empty histogram over `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> HalResult<Self> {
        if num_qubits > MAX_OUTCOME_QUBITS {
            return Err(HalError::CircuitTooLarge(format!(
                "{num_qubits} qubits exceed the {MAX_OUTCOME_QUBITS}-qubit outcome register"
            )));
        }
        Ok(Self {
            num_qubits,
            counts: BTreeMap::new(),
        })
    }

    /// Register width.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Add `count` occurrences of `outcome`.
    pub fn record(&mut self, outcome: u64, count: u64) {
        if count > 0 {
            *self.counts.entry(outcome).or_insert(0) += count;
        }
    }

    /// Sum of all counts.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate `(outcome, count)` pairs in ascending outcome order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.counts.iter().map(|(&outcome, &count)| (outcome, count))
    }

    /// Fold each outcome onto `keys`, first key leftmost.
    ///
    /// Qubits outside the register read as `0`.
    pub fn histogram(&self, keys: &[QubitId]) -> Counts {
        let mut counts = Counts::new();
        for (outcome, count) in self.iter() {
            let bitstring: String = keys
                .iter()
                .map(|q| {
                    let idx = q.index();
                    if idx < self.num_qubits && (outcome >> idx) & 1 == 1 {
                        '1'
                    } else {
                        '0'
                    }
                })
                .collect();
            counts.insert(bitstring, count);
        }
        counts
    }

    /// Histogram over every qubit of the register, qubit 0 leftmost.
    pub fn register_histogram(&self) -> Counts {
        let keys: Vec<QubitId> = (0..self.num_qubits as u32).map(QubitId).collect();
        self.histogram(&keys)
    }
}

/// Dense state vector, amplitude index bit `i` = qubit `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statevector {
    amplitudes: Vec<Complex64>,
}

impl Statevector {
    /// Wrap raw amplitudes. The length must be a power of two.
    pub fn new(amplitudes: Vec<Complex64>) -> HalResult<Self> {
        if !amplitudes.len().is_power_of_two() {
            return Err(HalError::Backend(format!(
                "state vector length {} is not a power of two",
                amplitudes.len()
            )));
        }
        Ok(Self { amplitudes })
    }

    /// Amplitudes in index order.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Number of qubits the vector describes.
    pub fn num_qubits(&self) -> usize {
        self.amplitudes.len().trailing_zeros() as usize
    }

    /// Amplitude of basis state `index`.
    pub fn amplitude(&self, index: usize) -> Option<Complex64> {
        self.amplitudes.get(index).copied()
    }

    /// `|a_i|^2` for every basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Squared norm, 1 for a valid state.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Consume into the amplitude vector.
    pub fn into_inner(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// The same state with index bits reversed, so that qubit 0 becomes the
    /// most significant bit.
    pub fn reversed(&self) -> Self {
        let n = self.num_qubits();
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); self.amplitudes.len()];
        for (index, amp) in self.amplitudes.iter().enumerate() {
            amplitudes[reverse_low_bits(index, n)] = *amp;
        }
        Self { amplitudes }
    }
}

fn reverse_low_bits(index: usize, width: usize) -> usize {
    if width == 0 {
        index
    } else {
        index.reverse_bits() >> (usize::BITS as usize - width)
    }
}

/// Result of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Classical-register counts, highest classical bit leftmost.
    pub counts: Counts,
    /// Number of shots executed.
    pub shots: u32,
    /// Joint full-register outcomes, when the engine reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Outcomes>,
    /// Wall-clock execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionResult {
    /// Create a result from counts.
    pub fn new(counts: Counts, shots: u32) -> Self {
        Self {
            counts,
            shots,
            outcomes: None,
            execution_time_ms: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach joint outcomes.
    #[must_use]
    pub fn with_outcomes(mut self, outcomes: Outcomes) -> Self {
        self.outcomes = Some(outcomes);
        self
    }

    /// Set the execution time.
    #[must_use]
    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
