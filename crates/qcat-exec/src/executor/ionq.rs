//! IonQ path: counts from the IonQ cloud, keyed like Cirq.

use std::fmt;

use async_trait::async_trait;
use qcat_adapter_ionq::IonqBackend;
use qcat_hal::{Backend, WaitPolicy};
use tracing::{info, instrument};

use super::{ExecRequest, Executor, outcomes_of};
use crate::bits::{keyed_histogram, oriented};
use crate::config::ExecConfig;
use crate::error::{ExecError, ExecResult};
use crate::output::ExecutionOutput;
use crate::selector::Selector;
use crate::target::Adapter;

/// IonQ API key and the target jobs go to.
#[derive(Clone, PartialEq, Eq)]
pub struct IonqCredentials {
    pub key: String,
    pub default_target: String,
}

impl IonqCredentials {
    pub fn new(key: impl Into<String>, default_target: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default_target: default_target.into(),
        }
    }
}

impl fmt::Debug for IonqCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IonqCredentials")
            .field("key", &"[REDACTED]")
            .field("default_target", &self.default_target)
            .finish()
    }
}

/// IonQ execution path. Counts only.
pub struct IonqExecutor {
    backend: IonqBackend,
    reverse_bits: bool,
    wait: WaitPolicy,
}

impl IonqExecutor {
    /// Executor for `credentials` on the configured endpoint.
    pub fn new(credentials: &IonqCredentials, config: &ExecConfig) -> ExecResult<Self> {
        let backend = IonqBackend::with_endpoint(
            config.ionq.endpoint.clone(),
            credentials.key.clone(),
            credentials.default_target.clone(),
        )?;
        Ok(Self {
            backend,
            reverse_bits: config.conventions.ionq_reverse_bits,
            wait: config.wait,
        })
    }
}

#[async_trait]
impl Executor for IonqExecutor {
    fn adapter(&self) -> Adapter {
        Adapter::Ionq
    }

    #[instrument(skip_all, fields(ionq_target = %self.backend.target(), repetitions = request.repetitions()))]
    async fn execute(&self, request: &ExecRequest<'_>) -> ExecResult<ExecutionOutput> {
        if request.selector() == Selector::Statevector {
            return Err(ExecError::Unsupported(
                "IonQ does not return state vectors".into(),
            ));
        }

        let job_id = self
            .backend
            .submit(request.circuit(), request.repetitions())
            .await?;
        info!(job_id = %job_id, "waiting for IonQ job");
        let result = self.backend.wait_with(&job_id, &self.wait).await?;

        let outcomes = outcomes_of(result)?;
        let counts = keyed_histogram(&outcomes, request.operations());
        Ok(ExecutionOutput::Counts(oriented(counts, self.reverse_bits)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_hal::HalError;
    use qcat_ir::Circuit;

    fn offline_config() -> ExecConfig {
        let mut config = ExecConfig::default();
        config.ionq.endpoint = "http://127.0.0.1:9".into();
        config
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = IonqCredentials::new("secret", "simulator");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_zero_repetitions_rejected_offline() {
        let executor =
            IonqExecutor::new(&IonqCredentials::new("k", "simulator"), &offline_config()).unwrap();
        let circuit = Circuit::bell().unwrap();
        let err = executor
            .execute(&ExecRequest::new(&circuit).with_repetitions(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Hal(HalError::InvalidShots(_))));
    }

    #[tokio::test]
    async fn test_statevector_unsupported() {
        let executor =
            IonqExecutor::new(&IonqCredentials::new("k", "simulator"), &offline_config()).unwrap();
        let circuit = Circuit::bell().unwrap();
        let err = executor
            .execute(&ExecRequest::new(&circuit).with_selector(Selector::Statevector))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Unsupported(_)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = IonqExecutor::new(&IonqCredentials::new("", "simulator"), &offline_config())
            .err()
            .unwrap();
        assert!(matches!(err, ExecError::Ionq(_)));
    }
}
