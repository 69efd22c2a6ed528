//! IBM Quantum REST API client.
//!
//! Talks to the runtime API at `api.quantum-computing.ibm.com` with a bearer
//! token:
//! - listing the backends of an instance and their status
//! - submitting sampler jobs with OpenQASM 3 circuits
//! - polling job status, fetching results and cancelling

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{IbmError, IbmResult};

/// Default IBM Quantum API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.quantum-computing.ibm.com";

/// User-Agent sent with requests.
const USER_AGENT: &str = concat!("qcat/", env!("CARGO_PKG_VERSION"));

/// IBM Quantum API client.
pub struct IbmClient {
    client: Client,
    endpoint: String,
    /// Instance (`hub/group/project`) jobs are billed to.
    instance: Option<String>,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("instance", &self.instance)
            .finish()
    }
}

impl IbmClient {
    /// Create a client for `endpoint` authenticated with `token`.
    pub fn new(endpoint: impl Into<String>, token: &str) -> IbmResult<Self> {
        if token.trim().is_empty() {
            return Err(IbmError::MissingToken);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| IbmError::InvalidToken)?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            instance: None,
        })
    }

    /// Set the instance (`hub/group/project`) for job submission.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// The instance jobs are submitted under.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// List the backends visible to this token.
    #[instrument(skip(self))]
    pub async fn list_backends(&self) -> IbmResult<Vec<BackendInfo>> {
        let response = self.client.get(self.url("/v1/backends")).send().await?;
        let backends: BackendsResponse = read_json(response, None).await?;
        debug!("IBM returned {} backends", backends.backends.len());
        Ok(backends.backends)
    }

    /// Get details for a specific backend.
    #[instrument(skip(self))]
    pub async fn get_backend(&self, name: &str) -> IbmResult<BackendInfo> {
        let response = self
            .client
            .get(self.url(&format!("/v1/backends/{name}")))
            .send()
            .await?;
        read_json(response, Some(NotFound::Backend(name))).await
    }

    /// Submit a sampler job.
    #[instrument(skip(self, circuits))]
    pub async fn submit_sampler_job(
        &self,
        backend: &str,
        circuits: Vec<String>,
        shots: u32,
    ) -> IbmResult<SubmitResponse> {
        let request = SamplerJobRequest {
            program_id: "sampler".to_string(),
            backend: backend.to_string(),
            hub: self.instance.clone(),
            params: SamplerParams { circuits, shots },
        };

        let response = self
            .client
            .post(self.url("/v1/jobs"))
            .json(&request)
            .send()
            .await?;
        let submitted: SubmitResponse = read_json(response, None).await?;
        debug!("IBM accepted job {}", submitted.id);
        Ok(submitted)
    }

    /// Get job status.
    #[instrument(skip(self))]
    pub async fn get_job_status(&self, job_id: &str) -> IbmResult<JobStatusResponse> {
        let response = self
            .client
            .get(self.url(&format!("/v1/jobs/{job_id}")))
            .send()
            .await?;
        read_json(response, Some(NotFound::Job(job_id))).await
    }

    /// Get job results.
    #[instrument(skip(self))]
    pub async fn get_job_results(&self, job_id: &str) -> IbmResult<JobResultResponse> {
        let response = self
            .client
            .get(self.url(&format!("/v1/jobs/{job_id}/results")))
            .send()
            .await?;
        read_json(response, Some(NotFound::Job(job_id))).await
    }

    /// Cancel a job.
    #[instrument(skip(self))]
    pub async fn cancel_job(&self, job_id: &str) -> IbmResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/v1/jobs/{job_id}/cancel")))
            .send()
            .await?;
        check_status(response, Some(NotFound::Job(job_id))).await?;
        Ok(())
    }
}

/// What a 404 refers to.
enum NotFound<'a> {
    Backend(&'a str),
    Job(&'a str),
}

async fn check_status(response: Response, not_found: Option<NotFound<'_>>) -> IbmResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        match not_found {
            Some(NotFound::Backend(name)) => {
                return Err(IbmError::BackendUnavailable(name.to_string()));
            }
            Some(NotFound::Job(id)) => return Err(IbmError::JobNotFound(id.to_string())),
            None => {}
        }
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(|e| e.message().map(str::to_string))
        .unwrap_or(body);
    Err(IbmError::ApiError {
        status: Some(status.as_u16()),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    not_found: Option<NotFound<'_>>,
) -> IbmResult<T> {
    let response = check_status(response, not_found).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(IbmError::from)
}

// ============================================================================
// Request types
// ============================================================================

/// Sampler job request.
#[derive(Debug, Serialize)]
struct SamplerJobRequest {
    program_id: String,
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hub: Option<String>,
    params: SamplerParams,
}

/// Sampler primitive parameters.
#[derive(Debug, Serialize)]
struct SamplerParams {
    /// OpenQASM 3 circuits.
    circuits: Vec<String>,
    shots: u32,
}

// ============================================================================
// Response types
// ============================================================================

/// API error response.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.as_deref()))
    }
}

/// Backends list response (`{"backends": [...]}`).
#[derive(Debug, Deserialize)]
struct BackendsResponse {
    backends: Vec<BackendInfo>,
}

/// Backend information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Backend name.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Backend status.
    pub status: BackendStatus,
    /// Basis gates.
    #[serde(default)]
    pub basis_gates: Vec<String>,
    /// Whether this is a simulator.
    #[serde(default)]
    pub simulator: bool,
    /// Maximum number of shots.
    #[serde(default)]
    pub max_shots: Option<u32>,
}

/// Backend status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Whether the backend is operational.
    pub operational: bool,
    /// Status message.
    #[serde(default)]
    pub status_msg: Option<String>,
    /// Number of pending jobs.
    #[serde(default)]
    pub pending_jobs: Option<u32>,
}

/// Job submission response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Job ID.
    pub id: String,
    /// Initial job status.
    #[serde(default)]
    pub status: String,
}

/// Job status response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    /// Job ID.
    pub id: String,
    /// Job status, e.g. `"Queued"` or `"COMPLETED"`.
    pub status: String,
    /// Backend name.
    #[serde(default)]
    pub backend: Option<String>,
    /// Error information if failed.
    #[serde(default)]
    pub error: Option<JobError>,
}

/// Job error information.
#[derive(Debug, Clone, Deserialize)]
pub struct JobError {
    /// Error message.
    pub message: String,
}

impl JobStatusResponse {
    fn normalized_status(&self) -> String {
        self.status.to_uppercase()
    }

    /// Check if job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.normalized_status().as_str(),
            "COMPLETED" | "FAILED" | "CANCELLED" | "ERROR"
        )
    }

    /// Check if job completed successfully.
    pub fn is_completed(&self) -> bool {
        self.normalized_status() == "COMPLETED"
    }

    /// Check if job failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.normalized_status().as_str(), "FAILED" | "ERROR")
    }

    /// Check if job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.normalized_status() == "CANCELLED"
    }

    /// The failure reason, if reported.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.message.clone())
    }
}

/// Job result response.
#[derive(Debug, Deserialize)]
pub struct JobResultResponse {
    /// Results, one per submitted circuit.
    pub results: Vec<SamplerResult>,
}

/// Sampler result for one circuit.
#[derive(Debug, Deserialize)]
pub struct SamplerResult {
    /// Per-register raw samples, one hex string per shot.
    #[serde(default)]
    pub data: Option<HashMap<String, ClassicalRegisterData>>,
    /// Aggregated counts keyed by hex outcome.
    #[serde(default)]
    pub counts: Option<HashMap<String, u64>>,
    /// Quasi-probability distribution keyed by hex outcome.
    #[serde(default)]
    pub quasi_dists: Option<Vec<HashMap<String, f64>>>,
    /// Metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Raw samples of one classical register.
#[derive(Debug, Deserialize)]
pub struct ClassicalRegisterData {
    /// Hex strings such as `"0x3"`.
    pub samples: Vec<String>,
}
