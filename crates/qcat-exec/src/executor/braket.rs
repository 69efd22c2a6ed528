//! Braket-style path: local simulator, every qubit read, qubit 0 leftmost.

use async_trait::async_trait;
use qcat_adapter_sim::SimulatorBackend;
use tracing::instrument;

use super::{ExecRequest, Executor, outcomes_of};
use crate::bits::oriented;
use crate::config::ExecConfig;
use crate::error::ExecResult;
use crate::output::ExecutionOutput;
use crate::selector::Selector;
use crate::target::Adapter;

/// Braket-style execution path.
///
/// Keys cover the whole register with qubit 0 leftmost. They are reversed
/// only when `conventions.braket_reverse_bits` is set. State vectors use the
/// same order: qubit 0 is the most significant index bit.
pub struct BraketExecutor {
    simulator: SimulatorBackend,
    reverse_bits: bool,
}

impl BraketExecutor {
    pub fn new(config: &ExecConfig) -> Self {
        Self {
            simulator: super::local_simulator(config),
            reverse_bits: config.conventions.braket_reverse_bits,
        }
    }
}

#[async_trait]
impl Executor for BraketExecutor {
    fn adapter(&self) -> Adapter {
        Adapter::Braket
    }

    #[instrument(skip_all, fields(selector = %request.selector(), repetitions = request.repetitions()))]
    async fn execute(&self, request: &ExecRequest<'_>) -> ExecResult<ExecutionOutput> {
        match request.selector() {
            Selector::Counts => {
                let result = self
                    .simulator
                    .run(request.circuit(), request.repetitions())?;
                let counts = outcomes_of(result)?.register_histogram();
                Ok(ExecutionOutput::Counts(oriented(counts, self.reverse_bits)))
            }
            Selector::Statevector => Ok(ExecutionOutput::Statevector(
                self.simulator.statevector(request.circuit())?.reversed(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_ir::{Circuit, QubitId};

    #[tokio::test]
    async fn test_ghz_counts_sum_to_repetitions() {
        let circuit = Circuit::ghz(3).unwrap();
        let output = BraketExecutor::new(&ExecConfig::default())
            .execute(&ExecRequest::new(&circuit).with_repetitions(200))
            .await
            .unwrap();
        let counts = output.as_counts().unwrap();
        assert_eq!(counts.total_shots(), 200);
        assert!(counts.keys().all(|k| k == "000" || k == "111"));
    }

    #[tokio::test]
    async fn test_statevector_of_x() {
        let mut circuit = Circuit::with_size("x", 2, 0);
        circuit.x(QubitId(0)).unwrap();
        let output = BraketExecutor::new(&ExecConfig::default())
            .execute(&ExecRequest::new(&circuit).with_selector(Selector::Statevector))
            .await
            .unwrap();
        let state = output.into_statevector().unwrap();
        assert!((state.probabilities()[0b10] - 1.0).abs() < 1e-12);
    }
}
