//! IBM Quantum backend implementation.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use qcat_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, Counts,
    ExecutionResult, HalError, HalResult, JobId, JobStatus, ValidationResult,
};
use qcat_ir::Circuit;

use crate::api::{BackendInfo, DEFAULT_ENDPOINT, IbmClient, JobResultResponse};
use crate::error::{IbmError, IbmResult};
use crate::qasm;

/// How long to cache backend info before refreshing from the API.
const BACKEND_INFO_TTL: Duration = Duration::from_secs(5 * 60);

/// IBM Quantum backend adapter.
///
/// Counts are keyed with the highest classical bit leftmost.
#[derive(Debug)]
pub struct IbmBackend {
    client: Arc<IbmClient>,
    target: String,
    capabilities: Capabilities,
    backend_info: RwLock<Option<(BackendInfo, Instant)>>,
    /// Classical register width of each submitted job.
    job_widths: Mutex<FxHashMap<String, usize>>,
}

impl IbmBackend {
    /// Backend for a device already described by `info`.
    pub(crate) fn from_info(client: Arc<IbmClient>, info: BackendInfo) -> Self {
        let mut capabilities =
            Capabilities::ibm(&info.name, u32::try_from(info.num_qubits).unwrap_or(u32::MAX));
        capabilities.is_simulator = info.simulator;
        if let Some(max_shots) = info.max_shots {
            capabilities.max_shots = max_shots;
        }
        Self {
            client,
            target: info.name.clone(),
            capabilities,
            backend_info: RwLock::new(Some((info, Instant::now()))),
            job_widths: Mutex::new(FxHashMap::default()),
        }
    }

    /// Create a backend with explicit configuration.
    ///
    /// Reads `backend` (device name) and `instance` (`hub/group/project`)
    /// from the extra map.
    pub fn with_config(config: BackendConfig) -> IbmResult<Self> {
        let endpoint = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let token = config.token.as_deref().ok_or(IbmError::MissingToken)?;
        let target = config
            .extra_str("backend")
            .ok_or_else(|| IbmError::InvalidParameter("missing `backend` device name".into()))?;

        let mut client = IbmClient::new(endpoint, token)?;
        if let Some(instance) = config.extra_str("instance") {
            client = client.with_instance(instance);
        }

        Ok(Self {
            client: Arc::new(client),
            capabilities: Capabilities::ibm(target, 127),
            target: target.to_string(),
            backend_info: RwLock::new(None),
            job_widths: Mutex::new(FxHashMap::default()),
        })
    }

    /// Get the target device name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get backend information, fetching from API if not cached or stale.
    async fn get_backend_info(&self) -> IbmResult<BackendInfo> {
        {
            let cached = self.backend_info.read().await;
            if let Some((ref info, fetched_at)) = *cached {
                if fetched_at.elapsed() < BACKEND_INFO_TTL {
                    return Ok(info.clone());
                }
            }
        }

        let info = self.client.get_backend(&self.target).await?;
        *self.backend_info.write().await = Some((info.clone(), Instant::now()));
        Ok(info)
    }

    fn job_width(&self, job_id: &JobId) -> Option<usize> {
        self.job_widths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id.0)
            .copied()
    }

    /// Convert sampler results to counts, highest classical bit leftmost.
    ///
    /// `width` pads bitstrings to the circuit's classical register; without
    /// it the width is inferred from the largest outcome.
    fn results_to_counts(results: &JobResultResponse, width: Option<usize>) -> Counts {
        let mut counts = Counts::new();
        let Some(result) = results.results.first() else {
            return counts;
        };

        if let Some(data) = &result.data {
            for register in data.values() {
                let width = width.unwrap_or_else(|| infer_bit_width(&register.samples));
                for sample in &register.samples {
                    counts.insert(hex_to_binary(sample, width), 1);
                }
            }
        } else if let Some(raw_counts) = &result.counts {
            let keys: Vec<String> = raw_counts.keys().cloned().collect();
            let width = width.unwrap_or_else(|| infer_bit_width(&keys));
            for (outcome, &count) in raw_counts {
                counts.insert(hex_to_binary(outcome, width), count);
            }
        } else if let Some(dist) = result.quasi_dists.as_ref().and_then(|d| d.first()) {
            let shots = result
                .metadata
                .as_ref()
                .and_then(|m| m.get("shots"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(1024) as f64;
            let keys: Vec<String> = dist.keys().cloned().collect();
            let width = width.unwrap_or_else(|| infer_bit_width(&keys));
            for (outcome, &prob) in dist {
                let count = (prob * shots).max(0.0).round() as u64;
                if count > 0 {
                    counts.insert(hex_to_binary(outcome, width), count);
                }
            }
        }

        counts
    }
}

/// Bits needed for the largest hex outcome, at least 1.
fn infer_bit_width(samples: &[String]) -> usize {
    let max_val = samples
        .iter()
        .filter_map(|s| u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok())
        .max()
        .unwrap_or(0);
    (64 - max_val.leading_zeros() as usize).max(1)
}

/// `"0x3"` with width 4 becomes `"0011"`. Non-hex input passes through.
fn hex_to_binary(hex: &str, width: usize) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    match u64::from_str_radix(digits, 16) {
        Ok(value) => format!("{value:0>width$b}"),
        Err(_) => hex.to_string(),
    }
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.target
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        match self.get_backend_info().await {
            Ok(info) if info.status.operational => Ok(BackendAvailability {
                is_available: true,
                queue_depth: info.status.pending_jobs,
                estimated_wait: None,
                status_message: info.status.status_msg,
            }),
            Ok(info) => Ok(BackendAvailability::unavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "backend offline".to_string()),
            )),
            Err(e) => {
                warn!("IBM backend availability check failed: {e}");
                Ok(BackendAvailability::unavailable("failed to query backend"))
            }
        }
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(self.capabilities.check(circuit))
    }

    #[instrument(skip(self, circuit), fields(target = %self.target))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        if shots == 0 {
            return Err(HalError::InvalidShots(
                "IBM Quantum requires at least one shot".into(),
            ));
        }
        if shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} shots exceed the limit of {}",
                self.capabilities.max_shots
            )));
        }

        let info = self.get_backend_info().await?;
        if circuit.num_qubits() > info.num_qubits {
            return Err(IbmError::TooManyQubits {
                required: circuit.num_qubits(),
                available: info.num_qubits,
            }
            .into());
        }
        if !info.status.operational {
            return Err(HalError::BackendUnavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "Backend offline".to_string()),
            ));
        }

        let source = qasm::emit(circuit)?;
        let response = self
            .client
            .submit_sampler_job(&self.target, vec![source], shots)
            .await
            .map_err(|e| match e {
                IbmError::HttpError(_) | IbmError::ApiError { .. } => {
                    HalError::SubmissionFailed(e.to_string())
                }
                other => other.into(),
            })?;

        if circuit.num_clbits() > 0 {
            self.job_widths
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(response.id.clone(), circuit.num_clbits());
        }
        debug!("submitted IBM job {}", response.id);
        Ok(JobId(response.id))
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let status = self.client.get_job_status(&job_id.0).await?;

        let job_status = match status.status.to_uppercase().as_str() {
            "QUEUED" | "INITIALIZING" => JobStatus::Queued,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" | "ERROR" => JobStatus::Failed(
                status
                    .error_message()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            "CANCELLED" => JobStatus::Cancelled,
            _ => JobStatus::Running,
        };
        Ok(job_status)
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let status = self.client.get_job_status(&job_id.0).await?;
        if !status.is_completed() {
            if status.is_failed() {
                return Err(HalError::JobFailed(
                    status
                        .error_message()
                        .unwrap_or_else(|| "Job failed".to_string()),
                ));
            }
            if status.is_cancelled() {
                return Err(HalError::JobCancelled);
            }
            return Err(HalError::Backend(format!(
                "Job {} not yet completed",
                job_id.0
            )));
        }

        let results = self.client.get_job_results(&job_id.0).await?;
        let counts = Self::results_to_counts(&results, self.job_width(job_id));
        let shots = u32::try_from(counts.total_shots()).unwrap_or(u32::MAX);

        Ok(ExecutionResult::new(counts, shots)
            .with_metadata("backend", serde_json::json!(self.target)))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.client.cancel_job(&job_id.0).await?;
        Ok(())
    }
}

impl BackendFactory for IbmBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        Ok(Self::with_config(config)?)
    }
}
