//! qcat Local Statevector Simulator
//!
//! An exact statevector simulator used by every local execution path of
//! qcat: the IBM adapter without a token, the Cirq-style adapter and the
//! Braket-style adapter.
//!
//! # Features
//!
//! - **All Standard Gates**: every gate of `qcat-ir`
//! - **Shot sampling**: circuits whose measurements are all terminal are
//!   simulated once and sampled; otherwise each shot is simulated with
//!   measurement collapse
//! - **Joint outcomes**: results carry full-register [`Outcomes`] next to
//!   the classical-register counts
//! - **Seedable**: a fixed seed makes sampling reproducible
//!
//! # Memory
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 25 | ~512 MB |
//!
//! # Example
//!
//! ```ignore
//! use qcat_adapter_sim::SimulatorBackend;
//! use qcat_hal::Backend;
//! use qcat_ir::Circuit;
//!
//! let backend = SimulatorBackend::new().with_seed(7);
//! let circuit = Circuit::bell()?;
//! let job_id = backend.submit(&circuit, 1000).await?;
//! let result = backend.wait(&job_id).await?;
//! println!("{:?}", result.counts);
//!
//! let state = backend.statevector(&circuit)?;
//! println!("{:?}", state.amplitudes());
//! ```
//!
//! [`Outcomes`]: qcat_hal::Outcomes

mod run;
mod simulator;
mod state;

pub use simulator::{DEFAULT_MAX_QUBITS, MAX_SUPPORTED_QUBITS, SimulatorBackend};
