//! Target resolution and dispatch.

use qcat_adapter_ibm::AccountStore;
use qcat_adapter_ionq::IonqError;
use qcat_ir::{Circuit, Instruction};
use tracing::{info, instrument};

use crate::config::ExecConfig;
use crate::error::ExecResult;
use crate::executor::{
    BraketExecutor, CirqExecutor, ExecRequest, Executor, IbmAccess, IbmExecutor, IonqCredentials,
    IonqExecutor,
};
use crate::output::ExecutionOutput;
use crate::target::{Adapter, Target};

/// Routes circuits to the executor of a [`Target`].
///
/// Holds the configuration plus the caller's IBM access and IonQ
/// credentials. Executors are built per call; nothing is cached.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: ExecConfig,
    ibm: IbmAccess,
    ionq: Option<IonqCredentials>,
}

impl Dispatcher {
    /// Dispatcher for `config`.
    ///
    /// IBM access comes from `config.ibm`; see [`IbmAccess::from_config`].
    pub fn new(config: ExecConfig) -> ExecResult<Self> {
        let ibm = IbmAccess::from_config(&config.ibm)?;
        let ionq = config
            .ionq
            .api_key
            .as_ref()
            .map(|key| IonqCredentials::new(key.clone(), config.ionq.default_target.clone()));
        Ok(Self { config, ibm, ionq })
    }

    /// Replace the IBM access, e.g. with one read from an [`AccountStore`].
    #[must_use]
    pub fn with_ibm_access(mut self, access: IbmAccess) -> Self {
        self.ibm = access;
        self
    }

    /// Use the account saved in `store` for IBM, if any.
    pub fn with_account_store(self, store: &AccountStore) -> ExecResult<Self> {
        let access = IbmAccess::from_store(store, self.config.ibm.device.clone())?;
        Ok(self.with_ibm_access(access))
    }

    #[must_use]
    pub fn with_ionq_credentials(mut self, credentials: IonqCredentials) -> Self {
        self.ionq = Some(credentials);
        self
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn ibm_access(&self) -> &IbmAccess {
        &self.ibm
    }

    /// Executor for `adapter`.
    pub fn executor(&self, adapter: Adapter) -> ExecResult<Box<dyn Executor>> {
        Ok(match adapter {
            Adapter::Ibm => Box::new(IbmExecutor::new(self.ibm.clone(), &self.config)),
            Adapter::Cirq => Box::new(CirqExecutor::new(&self.config)),
            Adapter::Ionq => {
                let credentials = self.ionq.as_ref().ok_or(IonqError::MissingApiKey)?;
                Box::new(IonqExecutor::new(credentials, &self.config)?)
            }
            Adapter::Braket => Box::new(BraketExecutor::new(&self.config)),
        })
    }

    /// Run `circuit` on `target`.
    ///
    /// `operations` defaults to the circuit's own instructions.
    #[instrument(skip(self, circuit, operations), fields(route = %target, circuit = circuit.name()))]
    pub async fn dispatch(
        &self,
        target: Target,
        circuit: &Circuit,
        repetitions: u32,
        operations: Option<&[Instruction]>,
    ) -> ExecResult<ExecutionOutput> {
        let executor = self.executor(target.adapter())?;
        let mut request = ExecRequest::new(circuit)
            .with_selector(target.selector())
            .with_repetitions(repetitions);
        if let Some(operations) = operations {
            request = request.with_operations(operations);
        }

        let output = executor.execute(&request).await?;
        info!(kind = output.kind(), "execution finished");
        Ok(output)
    }
}
