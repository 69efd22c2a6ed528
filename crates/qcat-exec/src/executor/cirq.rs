//! Cirq-style path: local simulator, keys read from measurement keys.

use async_trait::async_trait;
use qcat_adapter_sim::SimulatorBackend;
use tracing::instrument;

use super::{ExecRequest, Executor, outcomes_of};
use crate::bits::{keyed_histogram, oriented};
use crate::config::ExecConfig;
use crate::error::ExecResult;
use crate::output::ExecutionOutput;
use crate::selector::Selector;
use crate::target::Adapter;

/// Cirq-style execution path.
///
/// Counts are keyed on the measured qubits in order of first measurement,
/// or on the whole register when nothing is measured, then reversed unless
/// `conventions.cirq_reverse_bits` is off. State vectors put qubit 0 in the
/// most significant index bit.
pub struct CirqExecutor {
    simulator: SimulatorBackend,
    reverse_bits: bool,
}

impl CirqExecutor {
    pub fn new(config: &ExecConfig) -> Self {
        Self {
            simulator: super::local_simulator(config),
            reverse_bits: config.conventions.cirq_reverse_bits,
        }
    }
}

#[async_trait]
impl Executor for CirqExecutor {
    fn adapter(&self) -> Adapter {
        Adapter::Cirq
    }

    #[instrument(skip_all, fields(selector = %request.selector(), repetitions = request.repetitions()))]
    async fn execute(&self, request: &ExecRequest<'_>) -> ExecResult<ExecutionOutput> {
        match request.selector() {
            Selector::Counts => {
                let result = self
                    .simulator
                    .run(request.circuit(), request.repetitions())?;
                let outcomes = outcomes_of(result)?;
                let counts = keyed_histogram(&outcomes, request.operations());
                Ok(ExecutionOutput::Counts(oriented(counts, self.reverse_bits)))
            }
            Selector::Statevector => Ok(ExecutionOutput::Statevector(
                self.simulator.statevector(request.circuit())?.reversed(),
            )),
        }
    }
}
