//! Closed set of backend and selector combinations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExecError, ExecResult};
use crate::selector::Selector;

/// The four execution paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adapter {
    /// Local simulator or IBM Quantum.
    Ibm,
    /// Local simulator with Cirq measurement keys.
    Cirq,
    /// IonQ cloud.
    Ionq,
    /// Local simulator with Braket key order.
    Braket,
}

impl Adapter {
    pub fn as_str(self) -> &'static str {
        match self {
            Adapter::Ibm => "ibm",
            Adapter::Cirq => "cirq",
            Adapter::Ionq => "ionq",
            Adapter::Braket => "braket",
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a circuit runs and what comes back.
///
/// IonQ has no state-vector variant: the service only returns
/// probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    IbmCounts,
    IbmStatevector,
    CirqCounts,
    CirqStatevector,
    IonqCounts,
    BraketCounts,
    BraketStatevector,
}

impl Target {
    /// Resolve an adapter and selector into a target.
    pub fn new(adapter: Adapter, selector: Selector) -> ExecResult<Self> {
        match (adapter, selector) {
            (Adapter::Ibm, Selector::Counts) => Ok(Target::IbmCounts),
            (Adapter::Ibm, Selector::Statevector) => Ok(Target::IbmStatevector),
            (Adapter::Cirq, Selector::Counts) => Ok(Target::CirqCounts),
            (Adapter::Cirq, Selector::Statevector) => Ok(Target::CirqStatevector),
            (Adapter::Ionq, Selector::Counts) => Ok(Target::IonqCounts),
            (Adapter::Ionq, Selector::Statevector) => Err(ExecError::Unsupported(
                "IonQ does not return state vectors".into(),
            )),
            (Adapter::Braket, Selector::Counts) => Ok(Target::BraketCounts),
            (Adapter::Braket, Selector::Statevector) => Ok(Target::BraketStatevector),
        }
    }

    pub fn adapter(self) -> Adapter {
        match self {
            Target::IbmCounts | Target::IbmStatevector => Adapter::Ibm,
            Target::CirqCounts | Target::CirqStatevector => Adapter::Cirq,
            Target::IonqCounts => Adapter::Ionq,
            Target::BraketCounts | Target::BraketStatevector => Adapter::Braket,
        }
    }

    pub fn selector(self) -> Selector {
        match self {
            Target::IbmCounts | Target::CirqCounts | Target::IonqCounts | Target::BraketCounts => {
                Selector::Counts
            }
            Target::IbmStatevector | Target::CirqStatevector | Target::BraketStatevector => {
                Selector::Statevector
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.adapter(), self.selector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_parts() {
        for target in [
            Target::IbmCounts,
            Target::IbmStatevector,
            Target::CirqCounts,
            Target::CirqStatevector,
            Target::IonqCounts,
            Target::BraketCounts,
            Target::BraketStatevector,
        ] {
            assert_eq!(
                Target::new(target.adapter(), target.selector()).unwrap(),
                target
            );
        }
    }

    #[test]
    fn test_ionq_statevector_unsupported() {
        assert!(matches!(
            Target::new(Adapter::Ionq, Selector::Statevector),
            Err(ExecError::Unsupported(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Target::BraketCounts.to_string(), "braket:qasm_simulator");
    }
}
