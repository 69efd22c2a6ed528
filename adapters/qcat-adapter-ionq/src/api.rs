//! IonQ REST API client.
//!
//! Implements the subset of the IonQ v0.3 API (`https://api.ionq.co/v0.3`)
//! needed to submit `ionq.circuit.v0` jobs and read back their probabilities.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{IonqError, IonqResult};

/// IonQ cloud API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.ionq.co/v0.3";

/// IonQ REST API client.
///
/// Authenticates with `Authorization: apiKey <key>`.
pub struct IonqClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for IonqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IonqClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl IonqClient {
    /// Create a client against the production endpoint.
    pub fn new(api_key: impl Into<String>) -> IonqResult<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    /// Create a client against a custom endpoint.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> IonqResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(IonqError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Base URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn auth_header(&self) -> String {
        format!("apiKey {}", self.api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> IonqResult<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        handle_response(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> IonqResult<T> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    async fn put(&self, path: &str) -> IonqResult<()> {
        let url = self.url(path);
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response).await)
        }
    }

    /// List the targets visible to this key.
    #[instrument(skip(self))]
    pub async fn list_backends(&self) -> IonqResult<Vec<BackendInfo>> {
        self.get("backends").await
    }

    /// Submit a circuit job.
    #[instrument(skip(self, request), fields(target = %request.target, shots = request.shots))]
    pub async fn submit_job(&self, request: &JobRequest) -> IonqResult<SubmitResponse> {
        self.post("jobs", request).await
    }

    /// Fetch job metadata and status.
    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: &str) -> IonqResult<JobResponse> {
        self.get(&format!("jobs/{job_id}")).await
    }

    /// Fetch the probability histogram of a completed job.
    #[instrument(skip(self))]
    pub async fn get_results(&self, job_id: &str) -> IonqResult<HashMap<String, f64>> {
        self.get(&format!("jobs/{job_id}/results")).await
    }

    /// Cancel a queued or running job.
    #[instrument(skip(self))]
    pub async fn cancel_job(&self, job_id: &str) -> IonqResult<()> {
        self.put(&format!("jobs/{job_id}/status/cancel")).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> IonqResult<T> {
    if response.status().is_success() {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        Err(error_from(response).await)
    }
}

async fn error_from(response: reqwest::Response) -> IonqError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND => IonqError::JobNotFound(message),
        _ => IonqError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

// ---------------------------------------------------------------------------
// Circuit format
// ---------------------------------------------------------------------------

/// One gate in the `ionq.circuit.v0` format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IonqGate {
    /// Gate name (`h`, `x`, `rz`, `swap`, ...).
    pub gate: &'static str,
    /// Target qubit indices.
    pub targets: Vec<u32>,
    /// Control qubit indices.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<u32>,
    /// Rotation angle in radians.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Request body for `POST /jobs`.
#[derive(Debug, Serialize)]
pub struct JobRequest {
    pub target: String,
    pub shots: u32,
    pub name: String,
    pub input: CircuitInput,
}

impl JobRequest {
    /// Wrap a serialized circuit into a job for `target`.
    pub fn new(target: impl Into<String>, shots: u32, qubits: u32, circuit: Vec<IonqGate>) -> Self {
        Self {
            target: target.into(),
            shots,
            name: format!("qcat-{}", uuid::Uuid::new_v4()),
            input: CircuitInput {
                format: "ionq.circuit.v0",
                qubits,
                circuit,
            },
        }
    }
}

/// Circuit payload of a job request.
#[derive(Debug, Serialize)]
pub struct CircuitInput {
    pub format: &'static str,
    pub qubits: u32,
    pub circuit: Vec<IonqGate>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response from `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response from `GET /jobs/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobResponse {
    pub id: String,
    /// `submitted | ready | running | completed | failed | canceled`.
    pub status: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub qubits: Option<u32>,
    #[serde(default)]
    pub shots: Option<u32>,
    #[serde(default)]
    pub failure: Option<JobFailure>,
    #[serde(default)]
    pub error: Option<JobFailure>,
}

/// Failure details of a job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFailure {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl JobResponse {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }

    pub fn is_failed(&self) -> bool {
        self.status.eq_ignore_ascii_case("failed")
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.status.to_lowercase().as_str(),
            "canceled" | "cancelled"
        )
    }

    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }

    /// Human-readable failure reason, if the server gave one.
    pub fn failure_message(&self) -> Option<String> {
        let failure = self.failure.as_ref().or(self.error.as_ref())?;
        failure
            .error
            .clone()
            .or_else(|| failure.message.clone())
            .or_else(|| failure.code.clone())
    }
}

/// Entry of `GET /backends`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendInfo {
    /// Target name, e.g. `simulator` or `qpu.aria-1`.
    pub backend: String,
    /// `available | running | reserved | calibrating | offline`.
    pub status: String,
    #[serde(default)]
    pub qubits: Option<u32>,
    #[serde(default)]
    pub average_queue_time: Option<u64>,
}

impl BackendInfo {
    /// Whether the target accepts jobs right now.
    pub fn is_available(&self) -> bool {
        matches!(
            self.status.to_lowercase().as_str(),
            "available" | "running"
        )
    }
}
