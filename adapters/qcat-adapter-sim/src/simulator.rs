//! Simulator backend implementation.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use qcat_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, ExecutionResult,
    HalError, HalResult, Job, JobId, JobStatus, Statevector, ValidationResult,
};
use qcat_ir::Circuit;

use crate::run::{evolve, run_shots};

/// Default register width accepted by the simulator.
pub const DEFAULT_MAX_QUBITS: u32 = 20;

/// Widest register the simulator will allocate (16 GiB of amplitudes).
pub const MAX_SUPPORTED_QUBITS: u32 = 30;

struct SimJob {
    job: Job,
    result: Option<ExecutionResult>,
}

/// Local simulator backend.
///
/// Jobs run to completion inside `submit`, so `status` reports `Completed`
/// right away. Counts are keyed on the classical register with the highest
/// classical bit leftmost; every result also carries the joint
/// full-register outcomes.
pub struct SimulatorBackend {
    config: BackendConfig,
    capabilities: Capabilities,
    jobs: Arc<Mutex<FxHashMap<String, SimJob>>>,
    rng: Mutex<StdRng>,
}

impl SimulatorBackend {
    /// Create a new simulator backend with default settings.
    pub fn new() -> Self {
        Self::with_max_qubits(DEFAULT_MAX_QUBITS)
    }

    /// Create a simulator with custom max qubits, capped at
    /// [`MAX_SUPPORTED_QUBITS`].
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self::build(BackendConfig::new("simulator"), max_qubits, None)
    }

    /// Make sampling reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn build(config: BackendConfig, max_qubits: u32, seed: Option<u64>) -> Self {
        let mut capabilities = Capabilities::simulator(max_qubits.min(MAX_SUPPORTED_QUBITS));
        capabilities.name.clone_from(&config.name);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            capabilities,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            rng: Mutex::new(rng),
        }
    }

    fn check_width(&self, circuit: &Circuit) -> HalResult<()> {
        if circuit.num_qubits() > self.capabilities.num_qubits as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but simulator only supports {}",
                circuit.num_qubits(),
                self.capabilities.num_qubits
            )));
        }
        Ok(())
    }

    /// Sample `circuit` `shots` times.
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    pub fn run(&self, circuit: &Circuit, shots: u32) -> HalResult<ExecutionResult> {
        self.check_width(circuit)?;
        let start = Instant::now();
        debug!(
            "Starting simulation: {} qubits, {} shots",
            circuit.num_qubits(),
            shots
        );

        let tally = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            run_shots(circuit, shots, &mut *rng)?
        };

        let elapsed = start.elapsed();
        debug!("Simulation completed in {:?}", elapsed);

        Ok(ExecutionResult::new(tally.counts, shots)
            .with_outcomes(tally.outcomes)
            .with_execution_time(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)))
    }

    /// Final state of `circuit` from |0...0⟩. Measurements are ignored.
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    pub fn statevector(&self, circuit: &Circuit) -> HalResult<Statevector> {
        self.check_width(circuit)?;
        let state = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            evolve(circuit, &mut *rng)
        };
        debug!("Computed state of {} qubits", circuit.num_qubits());
        Statevector::new(state.into_amplitudes())
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, SimJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(self.capabilities.check(circuit))
    }

    #[instrument(skip(self, circuit))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        let result = self.run(circuit, shots)?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let mut job = Job::new(job_id.clone(), shots).with_backend(self.name());
        job.transition(JobStatus::Completed);

        self.lock_jobs().insert(
            job_id.0.clone(),
            SimJob {
                job,
                result: Some(result),
            },
        );
        debug!("Submitted job: {}", job_id);

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        self.lock_jobs()
            .get(&job_id.0)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let jobs = self.lock_jobs();
        let sim_job = jobs
            .get(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        match &sim_job.job.status {
            JobStatus::Cancelled => Err(HalError::JobCancelled),
            _ => sim_job
                .result
                .clone()
                .ok_or_else(|| HalError::JobNotFound(job_id.0.clone())),
        }
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        let mut jobs = self.lock_jobs();
        let sim_job = jobs
            .get_mut(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        sim_job.job.transition(JobStatus::Cancelled);
        Ok(())
    }
}

impl BackendFactory for SimulatorBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let max_qubits = match config.extra_u64("max_qubits") {
            Some(v) => u32::try_from(v).map_err(|_| {
                HalError::Configuration(format!("max_qubits out of range: {v}"))
            })?,
            None => DEFAULT_MAX_QUBITS,
        };
        if max_qubits > MAX_SUPPORTED_QUBITS {
            return Err(HalError::Configuration(format!(
                "max_qubits {max_qubits} exceeds the supported {MAX_SUPPORTED_QUBITS}"
            )));
        }
        let seed = config.extra_u64("seed");
        Ok(Self::build(config, max_qubits, seed))
    }
}
