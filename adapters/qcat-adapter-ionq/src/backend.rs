//! IonQ backend implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use qcat_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, ExecutionResult,
    HalError, HalResult, Job, JobId, JobStatus, Outcomes, ValidationResult,
};
use qcat_ir::Circuit;

use crate::api::{DEFAULT_ENDPOINT, IonqClient, JobRequest};
use crate::error::{IonqError, IonqResult};
use crate::serializer;

/// Default IonQ target: the cloud simulator.
pub const DEFAULT_TARGET: &str = "simulator";

/// Qubits of the IonQ cloud simulator.
const SIMULATOR_QUBITS: u32 = 29;

/// Qubits assumed for QPU targets until the backend list says otherwise.
const QPU_QUBITS: u32 = 25;

/// Maximum number of cached job entries before evicting terminal-state entries.
const MAX_CACHED_JOBS: usize = 10_000;

struct CachedJob {
    job: Job,
    num_qubits: usize,
    result: Option<ExecutionResult>,
}

/// IonQ trapped-ion backend.
///
/// Results carry the full-register [`Outcomes`] and counts keyed with the
/// highest qubit leftmost.
///
/// ```ignore
/// use qcat_adapter_ionq::IonqBackend;
/// use qcat_hal::Backend;
///
/// let backend = IonqBackend::new(std::env::var("IONQ_API_KEY")?, "simulator")?;
/// let job_id = backend.submit(&qcat_ir::Circuit::bell()?, 100).await?;
/// let result = backend.wait(&job_id).await?;
/// ```
pub struct IonqBackend {
    client: IonqClient,
    target: String,
    capabilities: Capabilities,
    jobs: Mutex<FxHashMap<String, CachedJob>>,
}

impl IonqBackend {
    /// Backend for `target` on the production endpoint.
    pub fn new(api_key: impl Into<String>, target: impl Into<String>) -> IonqResult<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, target)
    }

    /// Backend for `target` on a custom endpoint.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        target: impl Into<String>,
    ) -> IonqResult<Self> {
        let client = IonqClient::with_endpoint(endpoint, api_key)?;
        let target = target.into();
        let is_simulator = target == DEFAULT_TARGET;
        let num_qubits = if is_simulator {
            SIMULATOR_QUBITS
        } else {
            QPU_QUBITS
        };

        Ok(Self {
            client,
            capabilities: Capabilities::ionq(&target, num_qubits, is_simulator),
            target,
            jobs: Mutex::new(FxHashMap::default()),
        })
    }

    /// Backend configured from `IONQ_API_KEY`.
    pub fn from_env(target: impl Into<String>) -> IonqResult<Self> {
        let key = std::env::var("IONQ_API_KEY").map_err(|_| IonqError::MissingApiKey)?;
        Self::new(key, target)
    }

    /// Target this backend submits to.
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn cached_result(&self, job_id: &JobId) -> Option<ExecutionResult> {
        let jobs = self.jobs.lock().await;
        jobs.get(&job_id.0).and_then(|cached| cached.result.clone())
    }
}

/// Convert a probability histogram into integer counts over `shots`.
///
/// Keys are decimal outcomes with bit `i` = qubit `i`. Counts are assigned
/// by largest remainder so they always sum to `shots`; ties go to the
/// smaller outcome.
pub fn probabilities_to_outcomes(
    probabilities: &HashMap<String, f64>,
    num_qubits: usize,
    shots: u32,
) -> IonqResult<Outcomes> {
    let mut parsed = Vec::with_capacity(probabilities.len());
    for (key, &p) in probabilities {
        let outcome: u64 = key
            .parse()
            .map_err(|_| IonqError::MalformedResult(format!("outcome key {key:?}")))?;
        if !p.is_finite() || p < 0.0 {
            return Err(IonqError::MalformedResult(format!(
                "probability {p} for outcome {key}"
            )));
        }
        parsed.push((outcome, p));
    }
    parsed.sort_unstable_by_key(|&(outcome, _)| outcome);

    let mut outcomes =
        Outcomes::new(num_qubits).map_err(|e| IonqError::CircuitTooLarge(e.to_string()))?;
    let total: f64 = parsed.iter().map(|&(_, p)| p).sum();
    if total <= 0.0 || shots == 0 {
        return Ok(outcomes);
    }

    let shots_f = f64::from(shots);
    let mut assigned = 0u64;
    let mut remainders = Vec::with_capacity(parsed.len());
    let mut floors = Vec::with_capacity(parsed.len());
    for &(outcome, p) in &parsed {
        let exact = p / total * shots_f;
        let floor = exact.floor();
        floors.push((outcome, floor as u64));
        remainders.push((outcome, exact - floor));
        assigned += floor as u64;
    }

    let leftover = u64::from(shots).saturating_sub(assigned);
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let bonus: FxHashMap<u64, u64> = remainders
        .iter()
        .take(usize::try_from(leftover).unwrap_or(usize::MAX))
        .map(|&(outcome, _)| (outcome, 1))
        .collect();

    for (outcome, floor) in floors {
        outcomes.record(outcome, floor + bonus.get(&outcome).copied().unwrap_or(0));
    }
    Ok(outcomes)
}

#[async_trait]
impl Backend for IonqBackend {
    fn name(&self) -> &str {
        &self.target
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[instrument(skip(self))]
    async fn availability(&self) -> HalResult<BackendAvailability> {
        let backends = match self.client.list_backends().await {
            Ok(backends) => backends,
            Err(e) => {
                debug!("IonQ availability check failed: {}", e);
                return Ok(BackendAvailability::unavailable(e.to_string()));
            }
        };

        match backends.iter().find(|b| b.backend == self.target) {
            Some(info) if info.is_available() => Ok(BackendAvailability {
                is_available: true,
                queue_depth: None,
                estimated_wait: info
                    .average_queue_time
                    .map(std::time::Duration::from_millis),
                status_message: Some(info.status.clone()),
            }),
            Some(info) => Ok(BackendAvailability::unavailable(info.status.clone())),
            None => Ok(BackendAvailability::unavailable(format!(
                "unknown target {}",
                self.target
            ))),
        }
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        let mut validation = self.capabilities.check(circuit);
        if circuit
            .instructions()
            .iter()
            .any(|inst| matches!(inst.kind, qcat_ir::InstructionKind::Reset))
        {
            let reason = "IonQ circuits cannot contain reset".to_string();
            validation = match validation {
                ValidationResult::Valid => ValidationResult::Invalid {
                    reasons: vec![reason],
                },
                ValidationResult::Invalid { mut reasons } => {
                    reasons.push(reason);
                    ValidationResult::Invalid { reasons }
                }
            };
        }
        Ok(validation)
    }

    #[instrument(skip(self, circuit), fields(target = %self.target))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        if shots == 0 {
            return Err(HalError::InvalidShots(
                "IonQ requires at least one shot".into(),
            ));
        }
        if shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "Requested {shots} shots but IonQ maximum is {}",
                self.capabilities.max_shots
            )));
        }
        if circuit.num_qubits() > self.capabilities.num_qubits as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but {} supports at most {}",
                circuit.num_qubits(),
                self.target,
                self.capabilities.num_qubits
            )));
        }

        let gates = serializer::serialize(circuit)?;
        let qubits = u32::try_from(circuit.num_qubits()).unwrap_or(u32::MAX);
        let request = JobRequest::new(&self.target, shots, qubits, gates);

        info!(
            "Submitting circuit to IonQ {}: {} qubits, {} shots",
            self.target, qubits, shots
        );
        let response = self
            .client
            .submit_job(&request)
            .await
            .map_err(|e| match e {
                IonqError::Http(_) | IonqError::ApiError { .. } => {
                    HalError::SubmissionFailed(e.to_string())
                }
                other => other.into(),
            })?;

        let job_id = JobId::new(&response.id);
        let job = Job::new(job_id.clone(), shots).with_backend(&self.target);
        {
            let mut jobs = self.jobs.lock().await;
            if jobs.len() >= MAX_CACHED_JOBS {
                jobs.retain(|_, cached| !cached.job.status.is_terminal());
            }
            jobs.insert(
                job_id.0.clone(),
                CachedJob {
                    job,
                    num_qubits: circuit.num_qubits(),
                    result: None,
                },
            );
        }

        info!("IonQ job submitted: {}", job_id);
        Ok(job_id)
    }

    #[instrument(skip(self))]
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let response = self.client.get_job(&job_id.0).await?;

        let status = if response.is_completed() {
            JobStatus::Completed
        } else if response.is_failed() {
            JobStatus::Failed(
                response
                    .failure_message()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        } else if response.is_cancelled() {
            JobStatus::Cancelled
        } else if response.is_running() {
            JobStatus::Running
        } else {
            JobStatus::Queued
        };

        let mut jobs = self.jobs.lock().await;
        if let Some(cached) = jobs.get_mut(&job_id.0) {
            cached.job.transition(status.clone());
        }

        Ok(status)
    }

    #[instrument(skip(self))]
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        if let Some(result) = self.cached_result(job_id).await {
            return Ok(result);
        }

        let job = self.client.get_job(&job_id.0).await?;
        if job.is_failed() {
            return Err(HalError::JobFailed(
                job.failure_message()
                    .unwrap_or_else(|| "Job failed".to_string()),
            ));
        }
        if job.is_cancelled() {
            return Err(HalError::JobCancelled);
        }
        if !job.is_completed() {
            return Err(HalError::Backend(format!(
                "Job {} is not yet completed (status: {})",
                job_id, job.status
            )));
        }

        let (cached_qubits, cached_shots) = {
            let jobs = self.jobs.lock().await;
            jobs.get(&job_id.0)
                .map_or((None, None), |c| (Some(c.num_qubits), Some(c.job.shots)))
        };
        let num_qubits = cached_qubits
            .or(job.qubits.map(|q| q as usize))
            .ok_or_else(|| {
                HalError::Backend(format!("IonQ job {job_id} did not report its width"))
            })?;
        let shots = cached_shots.or(job.shots).ok_or_else(|| {
            HalError::Backend(format!("IonQ job {job_id} did not report its shot count"))
        })?;

        let probabilities = self.client.get_results(&job_id.0).await?;
        let outcomes = probabilities_to_outcomes(&probabilities, num_qubits, shots)?;
        let counts = outcomes.register_histogram().reversed();
        let result = ExecutionResult::new(counts, shots)
            .with_outcomes(outcomes)
            .with_metadata("backend", serde_json::Value::String(self.target.clone()));

        {
            let mut jobs = self.jobs.lock().await;
            if let Some(cached) = jobs.get_mut(&job_id.0) {
                cached.job.transition(JobStatus::Completed);
                cached.result = Some(result.clone());
            }
        }

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.client.cancel_job(&job_id.0).await?;
        let mut jobs = self.jobs.lock().await;
        if let Some(cached) = jobs.get_mut(&job_id.0) {
            cached.job.transition(JobStatus::Cancelled);
        }
        Ok(())
    }
}

impl BackendFactory for IonqBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let api_key = config
            .token
            .clone()
            .ok_or_else(|| HalError::from(IonqError::MissingApiKey))?;
        let target = config.extra_str("target").unwrap_or(DEFAULT_TARGET);
        let endpoint = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        Ok(Self::with_endpoint(endpoint, api_key, target)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn probs(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|&(k, p)| (k.to_string(), p)).collect()
    }

    #[test]
    fn test_exact_probabilities() {
        let outcomes = probabilities_to_outcomes(&probs(&[("0", 0.5), ("3", 0.5)]), 2, 100).unwrap();
        let counts: Vec<_> = outcomes.iter().collect();
        assert_eq!(counts, vec![(0, 50), (3, 50)]);
    }

    #[test]
    fn test_largest_remainder() {
        let third = 1.0 / 3.0;
        let outcomes =
            probabilities_to_outcomes(&probs(&[("0", third), ("1", third), ("2", third)]), 2, 100)
                .unwrap();
        let counts: Vec<_> = outcomes.iter().collect();
        assert_eq!(counts, vec![(0, 34), (1, 33), (2, 33)]);
    }

    #[test]
    fn test_malformed_keys_rejected() {
        assert!(matches!(
            probabilities_to_outcomes(&probs(&[("zero", 1.0)]), 1, 10),
            Err(IonqError::MalformedResult(_))
        ));
        assert!(probabilities_to_outcomes(&probs(&[("0", -0.1)]), 1, 10).is_err());
    }

    #[test]
    fn test_empty_probabilities() {
        let outcomes = probabilities_to_outcomes(&HashMap::new(), 2, 10).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_capabilities_by_target() {
        let sim = IonqBackend::new("key", "simulator").unwrap();
        assert!(sim.capabilities().is_simulator);
        assert_eq!(sim.capabilities().num_qubits, SIMULATOR_QUBITS);

        let qpu = IonqBackend::new("key", "qpu.aria-1").unwrap();
        assert!(!qpu.capabilities().is_simulator);
        assert_eq!(qpu.name(), "qpu.aria-1");
    }

    #[tokio::test]
    async fn test_zero_shots_rejected_before_network() {
        let backend = IonqBackend::with_endpoint("http://127.0.0.1:9", "key", "simulator").unwrap();
        let err = backend
            .submit(&Circuit::bell().unwrap(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidShots(_)));
    }

    #[tokio::test]
    async fn test_validate_rejects_reset() {
        let backend = IonqBackend::new("key", "simulator").unwrap();
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit.reset(qcat_ir::QubitId(0)).unwrap();
        assert!(!backend.validate(&circuit).await.unwrap().is_valid());
    }

    #[test]
    fn test_factory_requires_key() {
        let err = IonqBackend::from_config(BackendConfig::new("ionq")).err().unwrap();
        assert!(matches!(err, HalError::AuthenticationFailed(_)));
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_shots(
            weights in proptest::collection::vec(0.0f64..1.0, 1..16),
            shots in 1u32..5000,
        ) {
            let map: HashMap<String, f64> = weights
                .iter()
                .enumerate()
                .map(|(i, &w)| (i.to_string(), w))
                .collect();
            let outcomes = probabilities_to_outcomes(&map, 4, shots).unwrap();
            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                prop_assert_eq!(outcomes.total_shots(), u64::from(shots));
            } else {
                prop_assert!(outcomes.is_empty());
            }
        }
    }
}
