//! qcat adapter for IonQ trapped-ion quantum computers
//!
//! Submits circuits to the IonQ cloud API (`https://api.ionq.co/v0.3`) in
//! the `ionq.circuit.v0` JSON format and converts the returned probability
//! histogram into shot counts.
//!
//! # Authentication
//!
//! Jobs are authorized with an API key sent as `Authorization: apiKey <key>`.
//! [`IonqBackend::from_env`] reads it from `IONQ_API_KEY`.
//!
//! # Targets
//!
//! | Target | Type | Qubits |
//! |--------|------|--------|
//! | `simulator` | cloud simulator | 29 |
//! | `qpu.*` | trapped-ion hardware | 25 |
//!
//! # Results
//!
//! IonQ reports probabilities keyed by the decimal outcome, bit `i` being
//! qubit `i`. The backend turns them into exactly `shots` counts by largest
//! remainder and attaches the full-register [`qcat_hal::Outcomes`].

mod api;
mod backend;
mod error;
pub mod serializer;

pub use api::{BackendInfo, DEFAULT_ENDPOINT, IonqClient, IonqGate, JobRequest};
pub use backend::{DEFAULT_TARGET, IonqBackend, probabilities_to_outcomes};
pub use error::{IonqError, IonqResult};
