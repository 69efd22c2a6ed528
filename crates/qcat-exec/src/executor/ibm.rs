//! IBM path: local simulator, or IBM Quantum through a caller-owned session.

use async_trait::async_trait;
use qcat_adapter_ibm::{AccountStore, IbmAccount, IbmSession};
use qcat_adapter_sim::SimulatorBackend;
use qcat_hal::{Backend, HalError, WaitPolicy};
use tracing::{debug, info, instrument};

use super::{ExecRequest, Executor};
use crate::config::{ExecConfig, IbmConfig};
use crate::error::{ExecError, ExecResult};
use crate::output::ExecutionOutput;
use crate::selector::Selector;
use crate::target::Adapter;

/// How the IBM path reaches a backend.
#[derive(Debug, Clone)]
pub enum IbmAccess {
    /// No credential: run on the local simulator.
    Local,
    /// IBM Quantum through `session`. `device: None` picks the least busy
    /// real device.
    Remote {
        session: IbmSession,
        device: Option<String>,
    },
}

impl IbmAccess {
    /// Remote access for an account.
    pub fn remote(account: IbmAccount, device: Option<String>) -> ExecResult<Self> {
        Ok(IbmAccess::Remote {
            session: IbmSession::open(account)?,
            device,
        })
    }

    /// Remote access when the configuration carries a token, local otherwise.
    ///
    /// No account file is read or written.
    pub fn from_config(config: &IbmConfig) -> ExecResult<Self> {
        let Some(token) = config.token.as_deref() else {
            return Ok(IbmAccess::Local);
        };
        let account = IbmAccount::new(token)
            .with_endpoint(config.endpoint.clone())
            .with_instance(
                config.hub.as_deref(),
                config.group.as_deref(),
                config.project.as_deref(),
            );
        Self::remote(account, config.device.clone())
    }

    /// Remote access for the account saved in `store`, local if none is.
    pub fn from_store(store: &AccountStore, device: Option<String>) -> ExecResult<Self> {
        match store.load()? {
            Some(account) => Self::remote(account, device),
            None => Ok(IbmAccess::Local),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, IbmAccess::Local)
    }
}

/// IBM execution path.
///
/// Counts keep the IBM convention: highest classical bit leftmost.
pub struct IbmExecutor {
    access: IbmAccess,
    simulator: SimulatorBackend,
    wait: WaitPolicy,
}

impl IbmExecutor {
    pub fn new(access: IbmAccess, config: &ExecConfig) -> Self {
        Self {
            access,
            simulator: super::local_simulator(config),
            wait: config.wait,
        }
    }

    pub fn access(&self) -> &IbmAccess {
        &self.access
    }
}

#[async_trait]
impl Executor for IbmExecutor {
    fn adapter(&self) -> Adapter {
        Adapter::Ibm
    }

    #[instrument(skip_all, fields(selector = %request.selector(), repetitions = request.repetitions()))]
    async fn execute(&self, request: &ExecRequest<'_>) -> ExecResult<ExecutionOutput> {
        let circuit = request.circuit();
        match (&self.access, request.selector()) {
            (IbmAccess::Local, Selector::Counts) => {
                debug!("running on the local simulator");
                let result = self.simulator.run(circuit, request.repetitions())?;
                Ok(ExecutionOutput::Counts(result.counts))
            }
            (IbmAccess::Local, Selector::Statevector) => {
                Ok(ExecutionOutput::Statevector(self.simulator.statevector(circuit)?))
            }
            (IbmAccess::Remote { .. }, Selector::Statevector) => Err(ExecError::Unsupported(
                "a state vector cannot be read from an IBM Quantum device".into(),
            )),
            (IbmAccess::Remote { session, device }, Selector::Counts) => {
                if request.repetitions() == 0 {
                    return Err(HalError::InvalidShots(
                        "IBM Quantum requires at least one shot".into(),
                    )
                    .into());
                }
                let backend = session.backend(device.as_deref()).await?;
                info!(device = backend.target(), "submitting to IBM Quantum");
                let job_id = backend.submit(circuit, request.repetitions()).await?;
                let result = backend.wait_with(&job_id, &self.wait).await?;
                Ok(ExecutionOutput::Counts(result.counts))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_ir::{Circuit, QubitId};

    #[test]
    fn test_no_token_is_local() {
        let access = IbmAccess::from_config(&IbmConfig::default()).unwrap();
        assert!(access.is_local());
    }

    #[test]
    fn test_token_opens_session() {
        let config = IbmConfig {
            token: Some("tok".into()),
            hub: Some("my-hub".into()),
            ..IbmConfig::default()
        };
        match IbmAccess::from_config(&config).unwrap() {
            IbmAccess::Remote { session, device } => {
                assert_eq!(session.account().instance(), "my-hub/open/main");
                assert!(device.is_none());
            }
            IbmAccess::Local => panic!("expected remote access"),
        }
    }

    #[tokio::test]
    async fn test_local_counts_use_ibm_order() {
        let mut circuit = Circuit::with_size("x1", 2, 2);
        circuit.x(QubitId(0)).unwrap();
        circuit.measure_all().unwrap();

        let executor = IbmExecutor::new(IbmAccess::Local, &ExecConfig::default());
        let output = executor
            .execute(&ExecRequest::new(&circuit).with_repetitions(10))
            .await
            .unwrap();
        assert_eq!(output.as_counts().unwrap().get("01"), 10);
    }

    #[tokio::test]
    async fn test_remote_statevector_unsupported() {
        let access = IbmAccess::remote(
            IbmAccount::new("tok").with_endpoint("http://127.0.0.1:9"),
            None,
        )
        .unwrap();
        let executor = IbmExecutor::new(access, &ExecConfig::default());
        let circuit = Circuit::bell().unwrap();
        let err = executor
            .execute(&ExecRequest::new(&circuit).with_selector(Selector::Statevector))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_remote_zero_repetitions_rejected_offline() {
        let access = IbmAccess::remote(
            IbmAccount::new("tok").with_endpoint("http://127.0.0.1:9"),
            None,
        )
        .unwrap();
        let executor = IbmExecutor::new(access, &ExecConfig::default());
        let circuit = Circuit::bell().unwrap();
        let err = executor
            .execute(&ExecRequest::new(&circuit).with_repetitions(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Hal(HalError::InvalidShots(_))));
    }
}
