//! IonQ backend against a mock of the v0.3 REST API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use qcat_hal::testing::MockServer;
use qcat_adapter_ionq::IonqBackend;
use qcat_hal::{Backend, HalError, JobId, WaitPolicy};
use qcat_ir::{Circuit, QubitId};

fn fast_poll() -> WaitPolicy {
    WaitPolicy::unbounded(Duration::from_millis(10)).with_max_wait(Duration::from_secs(5))
}

/// Mock whose job goes submitted -> running -> `final_status`.
async fn mock_ionq(final_status: &'static str, results: &'static str) -> MockServer {
    let polls = Arc::new(AtomicUsize::new(0));
    MockServer::start(move |req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/v0.3/jobs") => (200, r#"{"id": "ionq-1", "status": "submitted"}"#.to_string()),
        ("GET", "/v0.3/jobs/ionq-1") => {
            let status = match polls.fetch_add(1, Ordering::SeqCst) {
                0 => "submitted",
                1 => "running",
                _ => final_status,
            };
            (
                200,
                serde_json::json!({
                    "id": "ionq-1",
                    "status": status,
                    "qubits": 2,
                    "failure": {"error": "qubit calibration failed", "code": "QPU_ERROR"}
                })
                .to_string(),
            )
        }
        ("GET", "/v0.3/jobs/ionq-1/results") => (200, results.to_string()),
        ("PUT", "/v0.3/jobs/ionq-1/status/cancel") => {
            (200, r#"{"id": "ionq-1", "status": "canceled"}"#.to_string())
        }
        ("GET", "/v0.3/backends") => (
            200,
            r#"[{"backend": "simulator", "status": "available", "qubits": 29},
                {"backend": "qpu.aria-1", "status": "calibrating", "qubits": 25}]"#
                .to_string(),
        ),
        _ => (404, r#"{"error": "Not Found", "message": "no such route"}"#.to_string()),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_bell_round_trip() {
    let server = mock_ionq("completed", r#"{"0": 0.5, "3": 0.5}"#).await;
    let backend =
        IonqBackend::with_endpoint(format!("{}/v0.3", server.url()), "key-1", "simulator")
            .unwrap();

    let job_id = backend.submit(&Circuit::bell().unwrap(), 100).await.unwrap();
    assert_eq!(job_id, JobId::new("ionq-1"));

    let result = backend.wait_with(&job_id, &fast_poll()).await.unwrap();
    assert_eq!(result.shots, 100);
    assert_eq!(result.counts.get("00"), 50);
    assert_eq!(result.counts.get("11"), 50);

    let outcomes = result.outcomes.unwrap();
    let joint = outcomes.histogram(&[QubitId(0), QubitId(1)]);
    assert_eq!(joint.get("00") + joint.get("11"), 100);

    let requests = server.requests();
    let submit = &requests[0];
    assert_eq!(submit.method, "POST");
    assert_eq!(submit.header("authorization"), Some("apiKey key-1"));

    let body = submit.json();
    assert_eq!(body["target"], "simulator");
    assert_eq!(body["shots"], 100);
    assert_eq!(body["input"]["format"], "ionq.circuit.v0");
    assert_eq!(body["input"]["qubits"], 2);
    assert_eq!(
        body["input"]["circuit"],
        serde_json::json!([
            {"gate": "h", "targets": [0]},
            {"gate": "x", "targets": [1], "controls": [0]}
        ])
    );
}

#[tokio::test]
async fn test_uneven_probabilities_fill_all_shots() {
    let server = mock_ionq("completed", r#"{"0": 0.333, "1": 0.333, "2": 0.334}"#).await;
    let backend =
        IonqBackend::with_endpoint(format!("{}/v0.3", server.url()), "key", "simulator").unwrap();

    let job_id = backend.submit(&Circuit::bell().unwrap(), 10).await.unwrap();
    let result = backend.wait_with(&job_id, &fast_poll()).await.unwrap();
    assert_eq!(result.counts.total_shots(), 10);
    assert_eq!(result.counts.get("11"), 0);
}

#[tokio::test]
async fn test_failed_job_propagates() {
    let server = mock_ionq("failed", "{}").await;
    let backend =
        IonqBackend::with_endpoint(format!("{}/v0.3", server.url()), "key", "simulator").unwrap();

    let job_id = backend.submit(&Circuit::bell().unwrap(), 10).await.unwrap();
    let err = backend.wait_with(&job_id, &fast_poll()).await.unwrap_err();
    assert!(matches!(err, HalError::JobFailed(msg) if msg == "qubit calibration failed"));
}

#[tokio::test]
async fn test_cancel_and_availability() {
    let server = mock_ionq("completed", "{}").await;
    let endpoint = format!("{}/v0.3", server.url());

    let sim = IonqBackend::with_endpoint(&endpoint, "key", "simulator").unwrap();
    sim.cancel(&JobId::new("ionq-1")).await.unwrap();
    assert!(sim.availability().await.unwrap().is_available);

    let qpu = IonqBackend::with_endpoint(&endpoint, "key", "qpu.aria-1").unwrap();
    let availability = qpu.availability().await.unwrap();
    assert!(!availability.is_available);
    assert_eq!(availability.status_message.as_deref(), Some("calibrating"));

    assert!(
        server
            .requests()
            .iter()
            .any(|r| r.method == "PUT" && r.path == "/v0.3/jobs/ionq-1/status/cancel")
    );
}

#[tokio::test]
async fn test_rejected_key() {
    let server = MockServer::start(|_| (401, r#"{"error": "Invalid API key"}"#.to_string()))
        .await
        .unwrap();
    let backend =
        IonqBackend::with_endpoint(format!("{}/v0.3", server.url()), "bad", "simulator").unwrap();

    let err = backend.status(&JobId::new("ionq-1")).await.unwrap_err();
    assert!(matches!(err, HalError::AuthenticationFailed(msg) if msg.contains("Invalid API key")));
}

#[tokio::test]
#[ignore = "Requires IONQ_API_KEY and network access"]
async fn test_live_simulator_bell() {
    let backend = IonqBackend::from_env("simulator").unwrap();
    let job_id = backend.submit(&Circuit::bell().unwrap(), 100).await.unwrap();
    let result = backend.wait(&job_id).await.unwrap();
    assert_eq!(result.counts.total_shots(), 100);
}
