//! Choice between sampling and exact-state execution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Name selecting shot sampling.
pub const QASM_SIMULATOR: &str = "qasm_simulator";
/// Name selecting the final state vector.
pub const STATEVECTOR_SIMULATOR: &str = "statevector_simulator";

/// What an execution returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Sample the circuit and return a histogram.
    #[default]
    #[serde(rename = "qasm_simulator")]
    Counts,
    /// Return the final state vector.
    #[serde(rename = "statevector_simulator")]
    Statevector,
}

impl Selector {
    /// The selector's string name.
    pub fn as_str(self) -> &'static str {
        match self {
            Selector::Counts => QASM_SIMULATOR,
            Selector::Statevector => STATEVECTOR_SIMULATOR,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Selector {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            QASM_SIMULATOR => Ok(Selector::Counts),
            STATEVECTOR_SIMULATOR => Ok(Selector::Statevector),
            other => Err(ExecError::UnknownSelector(other.to_string())),
        }
    }
}
