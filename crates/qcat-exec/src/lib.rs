//! qcat dispatch layer
//!
//! Routes a prebuilt [`qcat_ir::Circuit`] to one of four execution paths
//! and returns either a bitstring histogram or a state vector.
//!
//! | Adapter | Engine | Counts keys | State vector index |
//! |---------|--------|-------------|--------------------|
//! | IBM | local simulator, or IBM Quantum with a session | highest classical bit leftmost | qubit 0 least significant |
//! | Cirq | local simulator | measured qubits, reversed | qubit 0 most significant |
//! | IonQ | IonQ cloud | measured qubits, reversed | none |
//! | Braket | local simulator | qubit 0 leftmost | qubit 0 most significant |
//!
//! The reversals are per-adapter flags in [`config::ConventionsConfig`].
//!
//! # Example
//!
//! ```ignore
//! use qcat_exec::{Dispatcher, ExecConfig, Target};
//! use qcat_ir::Circuit;
//!
//! let dispatcher = Dispatcher::new(ExecConfig::load(None)?)?;
//! let circuit = Circuit::bell()?;
//! let output = dispatcher.dispatch(Target::CirqCounts, &circuit, 1000, None).await?;
//! println!("{:?}", output.as_counts());
//! ```
//!
//! IBM credentials are never stored implicitly: remote access goes
//! through a caller-owned [`executor::IbmAccess`].

pub mod bits;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod output;
pub mod selector;
pub mod target;
pub mod telemetry;

pub use config::{ConfigError, ExecConfig};
pub use dispatch::Dispatcher;
pub use error::{ExecError, ExecResult};
pub use executor::{
    BraketExecutor, CirqExecutor, DEFAULT_REPETITIONS, ExecRequest, Executor, IbmAccess,
    IbmExecutor, IonqCredentials, IonqExecutor, on_braket, on_cirq, on_ibm, on_ionq,
};
pub use output::ExecutionOutput;
pub use selector::Selector;
pub use target::{Adapter, Target};
pub use telemetry::{init_default_tracing, init_tracing};
