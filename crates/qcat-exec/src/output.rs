//! Result of a dispatched execution.

use qcat_hal::{Counts, Statevector};
use serde::{Deserialize, Serialize};

/// Histogram or state vector, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutput {
    /// Bitstring to occurrence count.
    Counts(Counts),
    /// Final amplitudes in the index order of the adapter that produced them.
    Statevector(Statevector),
}

impl ExecutionOutput {
    /// `"counts"` or `"statevector"`.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionOutput::Counts(_) => "counts",
            ExecutionOutput::Statevector(_) => "statevector",
        }
    }

    /// The histogram, if this is one.
    pub fn as_counts(&self) -> Option<&Counts> {
        match self {
            ExecutionOutput::Counts(counts) => Some(counts),
            ExecutionOutput::Statevector(_) => None,
        }
    }

    /// The state vector, if this is one.
    pub fn as_statevector(&self) -> Option<&Statevector> {
        match self {
            ExecutionOutput::Statevector(state) => Some(state),
            ExecutionOutput::Counts(_) => None,
        }
    }

    pub fn into_counts(self) -> Option<Counts> {
        match self {
            ExecutionOutput::Counts(counts) => Some(counts),
            ExecutionOutput::Statevector(_) => None,
        }
    }

    pub fn into_statevector(self) -> Option<Statevector> {
        match self {
            ExecutionOutput::Statevector(state) => Some(state),
            ExecutionOutput::Counts(_) => None,
        }
    }
}

impl From<Counts> for ExecutionOutput {
    fn from(counts: Counts) -> Self {
        ExecutionOutput::Counts(counts)
    }
}

impl From<Statevector> for ExecutionOutput {
    fn from(state: Statevector) -> Self {
        ExecutionOutput::Statevector(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let mut counts = Counts::new();
        counts.insert("01", 3);
        let output = ExecutionOutput::from(counts.clone());
        assert_eq!(output.as_counts(), Some(&counts));
        assert!(output.as_statevector().is_none());
        assert_eq!(output.into_counts(), Some(counts));
    }

    #[test]
    fn test_serialized_shape() {
        let mut counts = Counts::new();
        counts.insert("1", 2);
        let json = serde_json::to_value(ExecutionOutput::Counts(counts)).unwrap();
        assert_eq!(json, serde_json::json!({"counts": {"1": 2}}));
    }
}
