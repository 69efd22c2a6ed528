//! Backend trait and configuration.
//!
//! The [`Backend`] trait covers the job lifecycle of an execution engine:
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&Capabilities` |
//! | `availability()` | async | yes | `HalResult<BackendAvailability>` |
//! | `validate()` | async | yes | `HalResult<ValidationResult>` |
//! | `submit()` | async | yes | `HalResult<JobId>` |
//! | `status()` | async | yes | `HalResult<JobStatus>` |
//! | `result()` | async | yes | `HalResult<ExecutionResult>` |
//! | `cancel()` | async | yes | `HalResult<()>` |
//! | `wait()` / `wait_with()` | async | provided | `HalResult<ExecutionResult>` |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use qcat_ir::Circuit;

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;

/// Configuration for a backend instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend.
    pub name: String,
    /// API endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Authentication token.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
            token: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the authentication token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add extra configuration.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Read a string value from the extra map.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_json::Value::as_str)
    }

    /// Read an unsigned integer from the extra map.
    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(serde_json::Value::as_u64)
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// How [`Backend::wait_with`] polls for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// Delay between two status polls.
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Give up after this long. `None` waits until the job is terminal.
    #[serde(with = "opt_millis", default)]
    pub max_wait: Option<Duration>,
}

impl WaitPolicy {
    /// Poll every `poll_interval` until the job is terminal.
    pub fn unbounded(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            max_wait: None,
        }
    }

    /// Set a deadline.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_millis(500))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

/// Trait for quantum backends.
///
/// # Contract
///
/// - `capabilities()` is synchronous and infallible; implementations cache
///   them at construction time.
/// - `validate()` checks the circuit against backend constraints before
///   submission.
/// - `submit()` returns a `JobId` whose initial status is `Queued` or later.
/// - `result()` is only meaningful once the status is `Completed`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check backend availability with queue depth information.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Validate a circuit against backend constraints.
    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult>;

    /// Submit a circuit for `shots` executions.
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the result of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Cancel a running job.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Wait for a job with the default [`WaitPolicy`].
    async fn wait(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        self.wait_with(job_id, &WaitPolicy::default()).await
    }

    /// Poll until the job is terminal, then fetch its result.
    async fn wait_with(&self, job_id: &JobId, policy: &WaitPolicy) -> HalResult<ExecutionResult> {
        let started = tokio::time::Instant::now();

        loop {
            let status = self.status(job_id).await?;
            debug!(job_id = %job_id, status = %status, "polled job status");

            match status {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {}
            }

            if let Some(max_wait) = policy.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(HalError::Timeout(job_id.0.clone()));
                }
            }
            tokio::time::sleep(policy.poll_interval).await;
        }
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Estimated wait time for a new job (if known).
    pub estimated_wait: Option<Duration>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Availability of a local engine: zero queue, zero wait.
    pub fn always_available() -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            estimated_wait: Some(Duration::ZERO),
            status_message: None,
        }
    }

    /// Create availability for an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            estimated_wait: None,
            status_message: Some(reason.into()),
        }
    }
}

/// Result of circuit validation against backend constraints.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Circuit is valid and can be submitted directly.
    Valid,
    /// Circuit is invalid for this backend.
    Invalid {
        /// Reasons the circuit is invalid.
        reasons: Vec<String>,
    },
}

impl ValidationResult {
    /// Check if the circuit is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Turn an invalid result into [`HalError::InvalidCircuit`].
    pub fn into_result(self) -> HalResult<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { reasons } => {
                Err(HalError::InvalidCircuit(reasons.join("; ")))
            }
        }
    }
}

/// Trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a backend from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::result::Counts;

    #[test]
    fn test_backend_config() {
        let config = BackendConfig::new("test")
            .with_endpoint("https://api.example.com")
            .with_token("secret-token")
            .with_extra("target", serde_json::json!("simulator"))
            .with_extra("max_qubits", serde_json::json!(12));

        assert_eq!(config.name, "test");
        assert_eq!(config.endpoint.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.extra_str("target"), Some("simulator"));
        assert_eq!(config.extra_u64("max_qubits"), Some(12));
        assert_eq!(config.extra_str("missing"), None);
    }

    #[test]
    fn test_backend_config_debug_redacts_token() {
        let config = BackendConfig::new("test").with_token("super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_wait_policy_serde() {
        let policy = WaitPolicy::unbounded(Duration::from_millis(250))
            .with_max_wait(Duration::from_secs(3));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"poll_interval":250,"max_wait":3000}"#);

        let parsed: WaitPolicy = serde_json::from_str(r#"{"poll_interval":100}"#).unwrap();
        assert_eq!(parsed, WaitPolicy::unbounded(Duration::from_millis(100)));
        assert_eq!(WaitPolicy::default().max_wait, None);
    }

    #[test]
    fn test_validation_into_result() {
        assert!(ValidationResult::Valid.into_result().is_ok());
        let err = ValidationResult::Invalid {
            reasons: vec!["too many qubits".into(), "bad gate".into()],
        }
        .into_result()
        .unwrap_err();
        assert!(err.to_string().contains("too many qubits; bad gate"));
    }

    /// Reports `Queued` a fixed number of times, then a final status.
    struct ScriptedBackend {
        caps: Capabilities,
        pending_polls: Mutex<u32>,
        terminal: JobStatus,
    }

    impl ScriptedBackend {
        fn new(pending_polls: u32, terminal: JobStatus) -> Self {
            Self {
                caps: Capabilities::simulator(2),
                pending_polls: Mutex::new(pending_polls),
                terminal,
            }
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capabilities(&self) -> &Capabilities {
            &self.caps
        }

        async fn availability(&self) -> HalResult<BackendAvailability> {
            Ok(BackendAvailability::always_available())
        }

        async fn validate(&self, _circuit: &Circuit) -> HalResult<ValidationResult> {
            Ok(ValidationResult::Valid)
        }

        async fn submit(&self, _circuit: &Circuit, _shots: u32) -> HalResult<JobId> {
            Ok(JobId::new("job-1"))
        }

        async fn status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
            let mut pending = self.pending_polls.lock().unwrap();
            if *pending > 0 {
                *pending -= 1;
                Ok(JobStatus::Queued)
            } else {
                Ok(self.terminal.clone())
            }
        }

        async fn result(&self, _job_id: &JobId) -> HalResult<ExecutionResult> {
            let mut counts = Counts::new();
            counts.insert("00", 7);
            Ok(ExecutionResult::new(counts, 7))
        }

        async fn cancel(&self, _job_id: &JobId) -> HalResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_until_completed() {
        let backend = ScriptedBackend::new(3, JobStatus::Completed);
        let result = backend.wait(&JobId::new("job-1")).await.unwrap();
        assert_eq!(result.counts.total_shots(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reports_failure_and_cancellation() {
        let failed = ScriptedBackend::new(1, JobStatus::Failed("calibration".into()));
        let err = failed.wait(&JobId::new("job-1")).await.unwrap_err();
        assert!(matches!(err, HalError::JobFailed(msg) if msg == "calibration"));

        let cancelled = ScriptedBackend::new(0, JobStatus::Cancelled);
        let err = cancelled.wait(&JobId::new("job-1")).await.unwrap_err();
        assert!(matches!(err, HalError::JobCancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_with_deadline_times_out() {
        let backend = ScriptedBackend::new(u32::MAX, JobStatus::Completed);
        let policy = WaitPolicy::unbounded(Duration::from_millis(100))
            .with_max_wait(Duration::from_secs(1));
        let err = backend
            .wait_with(&JobId::new("job-1"), &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::Timeout(id) if id == "job-1"));
    }
}
