//! The four execution paths behind one trait.
//!
//! Each executor takes an [`ExecRequest`] and returns an
//! [`ExecutionOutput`]. Executors keep no state between calls; every call
//! is one awaited round trip.

mod braket;
mod cirq;
mod ibm;
mod ionq;

use async_trait::async_trait;
use qcat_adapter_sim::SimulatorBackend;
use qcat_hal::{ExecutionResult, HalError, Outcomes};
use qcat_ir::{Circuit, Instruction};

pub use braket::BraketExecutor;
pub use cirq::CirqExecutor;
pub use ibm::{IbmAccess, IbmExecutor};
pub use ionq::{IonqCredentials, IonqExecutor};

use crate::config::ExecConfig;
use crate::error::ExecResult;
use crate::output::ExecutionOutput;
use crate::selector::Selector;
use crate::target::Adapter;

/// Repetitions used when a request does not set any.
pub const DEFAULT_REPETITIONS: u32 = 1024;

/// One execution: a circuit plus how to run it.
#[derive(Debug, Clone, Copy)]
pub struct ExecRequest<'a> {
    circuit: &'a Circuit,
    selector: Selector,
    repetitions: u32,
    operations: Option<&'a [Instruction]>,
}

impl<'a> ExecRequest<'a> {
    /// Sample `circuit` [`DEFAULT_REPETITIONS`] times.
    pub fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            selector: Selector::Counts,
            repetitions: DEFAULT_REPETITIONS,
            operations: None,
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Instructions measurement keys are derived from. Defaults to the
    /// circuit's own.
    #[must_use]
    pub fn with_operations(mut self, operations: &'a [Instruction]) -> Self {
        self.operations = Some(operations);
        self
    }

    pub fn circuit(&self) -> &'a Circuit {
        self.circuit
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn operations(&self) -> &'a [Instruction] {
        self.operations
            .unwrap_or_else(|| self.circuit.instructions())
    }
}

/// An execution path.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Which of the four paths this is.
    fn adapter(&self) -> Adapter;

    /// Run the request and shape its result.
    async fn execute(&self, request: &ExecRequest<'_>) -> ExecResult<ExecutionOutput>;
}

/// Full-register outcomes of a result, which every engine attaches.
fn outcomes_of(result: ExecutionResult) -> ExecResult<Outcomes> {
    result.outcomes.ok_or_else(|| {
        HalError::Backend("backend returned no per-qubit outcomes".into()).into()
    })
}

fn local_simulator(config: &ExecConfig) -> SimulatorBackend {
    let simulator = SimulatorBackend::with_max_qubits(config.simulator.max_qubits);
    match config.simulator.seed {
        Some(seed) => simulator.with_seed(seed),
        None => simulator,
    }
}

/// Run on IBM: local simulator without a session, IBM Quantum with one.
pub async fn on_ibm(
    circuit: &Circuit,
    selector: Selector,
    repetitions: u32,
    access: IbmAccess,
) -> ExecResult<ExecutionOutput> {
    let request = ExecRequest::new(circuit)
        .with_selector(selector)
        .with_repetitions(repetitions);
    IbmExecutor::new(access, &ExecConfig::default())
        .execute(&request)
        .await
}

/// Run on the local simulator with Cirq measurement keys.
pub async fn on_cirq(
    circuit: &Circuit,
    selector: Selector,
    repetitions: u32,
    operations: &[Instruction],
) -> ExecResult<ExecutionOutput> {
    let request = ExecRequest::new(circuit)
        .with_selector(selector)
        .with_repetitions(repetitions)
        .with_operations(operations);
    CirqExecutor::new(&ExecConfig::default())
        .execute(&request)
        .await
}

/// Run on IonQ and return counts.
pub async fn on_ionq(
    circuit: &Circuit,
    repetitions: u32,
    credentials: &IonqCredentials,
    operations: &[Instruction],
) -> ExecResult<ExecutionOutput> {
    let request = ExecRequest::new(circuit)
        .with_repetitions(repetitions)
        .with_operations(operations);
    IonqExecutor::new(credentials, &ExecConfig::default())?
        .execute(&request)
        .await
}

/// Run on the local simulator with Braket key order.
pub async fn on_braket(
    circuit: &Circuit,
    selector: Selector,
    repetitions: u32,
) -> ExecResult<ExecutionOutput> {
    let request = ExecRequest::new(circuit)
        .with_selector(selector)
        .with_repetitions(repetitions);
    BraketExecutor::new(&ExecConfig::default())
        .execute(&request)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let circuit = Circuit::bell().unwrap();
        let request = ExecRequest::new(&circuit);
        assert_eq!(request.selector(), Selector::Counts);
        assert_eq!(request.repetitions(), DEFAULT_REPETITIONS);
        assert_eq!(request.operations().len(), circuit.num_ops());
    }

    #[test]
    fn test_request_explicit_operations() {
        let circuit = Circuit::bell().unwrap();
        let request = ExecRequest::new(&circuit).with_operations(&circuit.instructions()[..2]);
        assert_eq!(request.operations().len(), 2);
    }
}
