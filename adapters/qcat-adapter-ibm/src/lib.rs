//! IBM Quantum adapter for qcat.
//!
//! - [`IbmAccount`] / [`AccountStore`]: caller-owned credentials, optionally
//!   persisted to `~/.qcat/ibm_account.json`
//! - [`IbmSession`]: authenticated context that lists devices and picks the
//!   least-busy one
//! - [`IbmBackend`]: the HAL [`Backend`](qcat_hal::Backend) for one device,
//!   submitting OpenQASM 3 sampler jobs
//!
//! # Example
//!
//! ```ignore
//! use qcat_adapter_ibm::{IbmAccount, IbmSession};
//! use qcat_hal::Backend;
//!
//! let session = IbmSession::open(IbmAccount::from_env()?)?;
//! let backend = session.backend(None).await?;
//! let job_id = backend.submit(&circuit, 1024).await?;
//! let result = backend.wait(&job_id).await?;
//! ```

mod account;
mod api;
mod backend;
mod error;
pub mod qasm;

pub use account::{
    AccountStore, DEFAULT_GROUP, DEFAULT_HUB, DEFAULT_PROJECT, IbmAccount, IbmSession, least_busy,
};
pub use api::{BackendInfo, BackendStatus, DEFAULT_ENDPOINT, IbmClient};
pub use backend::IbmBackend;
pub use error::{IbmError, IbmResult};
