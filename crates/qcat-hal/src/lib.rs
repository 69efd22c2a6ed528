//! qcat Hardware Abstraction Layer
//!
//! A unified interface over the execution engines qcat dispatches to: the
//! local statevector simulator, IBM Quantum and IonQ.
//!
//! # Overview
//!
//! - A common [`Backend`] trait for job submission and management
//! - [`Capabilities`] describing what an engine can run
//! - Unified result types: [`Counts`] (bitstring histograms), [`Outcomes`]
//!   (joint full-register histograms) and [`Statevector`]
//!
//! # Bit order
//!
//! Outcome integers and amplitude indices are little-endian in qubits: bit
//! `i` holds qubit `i`. Bitstring keys in [`Counts`] carry the order of the
//! code that produced them; each backend documents its own convention.
//!
//! # Example
//!
//! ```ignore
//! use qcat_hal::Backend;
//! use qcat_adapter_sim::SimulatorBackend;
//! use qcat_ir::Circuit;
//!
//! let backend = SimulatorBackend::new();
//! let circuit = Circuit::bell()?;
//! let job_id = backend.submit(&circuit, 1000).await?;
//! let result = backend.wait(&job_id).await?;
//! println!("{:?}", result.counts.most_frequent());
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use backend::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, ValidationResult, WaitPolicy,
};
pub use capability::{Capabilities, GateSet};
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use result::{Counts, ExecutionResult, MAX_OUTCOME_QUBITS, Outcomes, Statevector};
