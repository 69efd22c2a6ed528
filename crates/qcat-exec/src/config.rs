//! Configuration for the dispatch layer.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (`QCAT_` prefix, plus `IBM_QUANTUM_TOKEN` and
//!    `IONQ_API_KEY`)
//!
//! Environment variables take precedence over the file, which takes
//! precedence over the defaults.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use qcat_adapter_ibm::DEFAULT_ENDPOINT as IBM_ENDPOINT;
use qcat_adapter_ionq::{DEFAULT_ENDPOINT as IONQ_ENDPOINT, DEFAULT_TARGET};
use qcat_adapter_sim::{DEFAULT_MAX_QUBITS, MAX_SUPPORTED_QUBITS};
use qcat_hal::WaitPolicy;
use serde::{Deserialize, Serialize};

/// Complete dispatch configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// IBM Quantum access.
    pub ibm: IbmConfig,
    /// IonQ access.
    pub ionq: IonqConfig,
    /// Local simulator settings.
    pub simulator: SimulatorConfig,
    /// Key orientation per adapter.
    pub conventions: ConventionsConfig,
    /// Polling of remote jobs.
    pub wait: WaitPolicy,
    /// Tracing output.
    pub logging: LoggingConfig,
}

/// IBM Quantum settings. Without a token the local simulator is used.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IbmConfig {
    pub token: Option<String>,
    pub endpoint: String,
    pub hub: Option<String>,
    pub group: Option<String>,
    pub project: Option<String>,
    /// Device name. `None` picks the least busy device.
    pub device: Option<String>,
}

impl Default for IbmConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: IBM_ENDPOINT.to_string(),
            hub: None,
            group: None,
            project: None,
            device: None,
        }
    }
}

impl fmt::Debug for IbmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("hub", &self.hub)
            .field("group", &self.group)
            .field("project", &self.project)
            .field("device", &self.device)
            .finish()
    }
}

/// IonQ settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IonqConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub default_target: String,
}

impl Default for IonqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: IONQ_ENDPOINT.to_string(),
            default_target: DEFAULT_TARGET.to_string(),
        }
    }
}

impl fmt::Debug for IonqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IonqConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("default_target", &self.default_target)
            .finish()
    }
}

/// Local simulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub max_qubits: u32,
    /// Fixed RNG seed for reproducible sampling.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
            seed: None,
        }
    }
}

/// Whether each adapter reverses its histogram keys before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionsConfig {
    pub cirq_reverse_bits: bool,
    pub ionq_reverse_bits: bool,
    /// Off by default: Braket keys keep qubit 0 leftmost.
    pub braket_reverse_bits: bool,
}

impl Default for ConventionsConfig {
    fn default() -> Self {
        Self {
            cirq_reverse_bits: true,
            ionq_reverse_bits: true,
            braket_reverse_bits: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "console" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "console".to_string(),
        }
    }
}

impl ExecConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: ExecConfig =
            serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Load `config_file` if given, then apply environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env()
    }

    /// Apply environment variable overrides.
    pub fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Only variables that are set override the current values.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // IBM
        if let Some(v) = lookup("IBM_QUANTUM_TOKEN") {
            self.ibm.token = Some(v);
        }
        if let Some(v) = lookup("QCAT_IBM_ENDPOINT") {
            self.ibm.endpoint = v;
        }
        if let Some(v) = lookup("QCAT_IBM_HUB") {
            self.ibm.hub = Some(v);
        }
        if let Some(v) = lookup("QCAT_IBM_GROUP") {
            self.ibm.group = Some(v);
        }
        if let Some(v) = lookup("QCAT_IBM_PROJECT") {
            self.ibm.project = Some(v);
        }
        if let Some(v) = lookup("QCAT_IBM_DEVICE") {
            self.ibm.device = Some(v);
        }

        // IonQ
        if let Some(v) = lookup("IONQ_API_KEY") {
            self.ionq.api_key = Some(v);
        }
        if let Some(v) = lookup("QCAT_IONQ_ENDPOINT") {
            self.ionq.endpoint = v;
        }
        if let Some(v) = lookup("QCAT_IONQ_TARGET") {
            self.ionq.default_target = v;
        }

        // Simulator
        if let Some(v) = lookup("QCAT_SIM_MAX_QUBITS") {
            self.simulator.max_qubits = parse_var("QCAT_SIM_MAX_QUBITS", &v)?;
        }
        if let Some(v) = lookup("QCAT_SIM_SEED") {
            self.simulator.seed = Some(parse_var("QCAT_SIM_SEED", &v)?);
        }

        // Conventions
        if let Some(v) = lookup("QCAT_CIRQ_REVERSE_BITS") {
            self.conventions.cirq_reverse_bits = parse_var("QCAT_CIRQ_REVERSE_BITS", &v)?;
        }
        if let Some(v) = lookup("QCAT_IONQ_REVERSE_BITS") {
            self.conventions.ionq_reverse_bits = parse_var("QCAT_IONQ_REVERSE_BITS", &v)?;
        }
        if let Some(v) = lookup("QCAT_BRAKET_REVERSE_BITS") {
            self.conventions.braket_reverse_bits = parse_var("QCAT_BRAKET_REVERSE_BITS", &v)?;
        }

        // Wait
        if let Some(v) = lookup("QCAT_POLL_INTERVAL_MS") {
            self.wait.poll_interval =
                Duration::from_millis(parse_var("QCAT_POLL_INTERVAL_MS", &v)?);
        }
        if let Some(v) = lookup("QCAT_MAX_WAIT_MS") {
            self.wait.max_wait = Some(Duration::from_millis(parse_var("QCAT_MAX_WAIT_MS", &v)?));
        }

        // Logging
        if let Some(v) = lookup("QCAT_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("QCAT_LOG_FORMAT") {
            self.logging.format = v;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ibm.token.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "ibm.token must not be empty; omit it to use the local simulator".to_string(),
            ));
        }
        if self.ionq.api_key.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "ionq.api_key must not be empty".to_string(),
            ));
        }
        if self.ionq.default_target.is_empty() {
            return Err(ConfigError::ValidationError(
                "ionq.default_target must not be empty".to_string(),
            ));
        }
        if self.simulator.max_qubits == 0 {
            return Err(ConfigError::ValidationError(
                "simulator.max_qubits must be greater than 0".to_string(),
            ));
        }
        if self.simulator.max_qubits > MAX_SUPPORTED_QUBITS {
            return Err(ConfigError::ValidationError(format!(
                "simulator.max_qubits must be at most {MAX_SUPPORTED_QUBITS}"
            )));
        }
        if self.wait.poll_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "wait.poll_interval must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }
        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ParseError(format!("{name}: cannot parse {value:?}")))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ExecConfig::default();
        assert!(config.ibm.token.is_none());
        assert_eq!(config.ionq.default_target, "simulator");
        assert_eq!(config.simulator.max_qubits, DEFAULT_MAX_QUBITS);
        assert_eq!(config.wait, WaitPolicy::default());
        assert!(config.wait.max_wait.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_convention_defaults() {
        let conventions = ConventionsConfig::default();
        assert!(conventions.cirq_reverse_bits);
        assert!(conventions.ionq_reverse_bits);
        assert!(!conventions.braket_reverse_bits);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ExecConfig::from_yaml(
            "conventions:\n  braket_reverse_bits: true\nsimulator:\n  seed: 42\nwait:\n  poll_interval: 250\n  max_wait: 60000\n",
        )
        .unwrap();
        assert!(config.conventions.braket_reverse_bits);
        assert!(config.conventions.cirq_reverse_bits);
        assert_eq!(config.simulator.seed, Some(42));
        assert_eq!(config.simulator.max_qubits, DEFAULT_MAX_QUBITS);
        assert_eq!(config.wait.poll_interval, Duration::from_millis(250));
        assert_eq!(config.wait.max_wait, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(matches!(
            ExecConfig::from_yaml("logging:\n  format: xml\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ExecConfig::from_yaml("simulator: [1, 2]"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qcat.yaml");
        std::fs::write(&path, "ionq:\n  default_target: qpu.aria-1\n").unwrap();
        let config = ExecConfig::from_file(&path).unwrap();
        assert_eq!(config.ionq.default_target, "qpu.aria-1");

        assert!(matches!(
            ExecConfig::from_file(dir.path().join("missing.yaml")),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = ExecConfig::default()
            .merge_vars(vars(&[
                ("IBM_QUANTUM_TOKEN", "ibm-token"),
                ("QCAT_IBM_DEVICE", "ibm_kyoto"),
                ("IONQ_API_KEY", "ionq-key"),
                ("QCAT_SIM_SEED", "7"),
                ("QCAT_BRAKET_REVERSE_BITS", "true"),
                ("QCAT_MAX_WAIT_MS", "1000"),
                ("QCAT_LOG_FORMAT", "json"),
            ]))
            .unwrap();
        assert_eq!(config.ibm.token.as_deref(), Some("ibm-token"));
        assert_eq!(config.ibm.device.as_deref(), Some("ibm_kyoto"));
        assert_eq!(config.ionq.api_key.as_deref(), Some("ionq-key"));
        assert_eq!(config.simulator.seed, Some(7));
        assert!(config.conventions.braket_reverse_bits);
        assert_eq!(config.wait.max_wait, Some(Duration::from_secs(1)));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_parse_error() {
        let err = ExecConfig::default()
            .merge_vars(vars(&[("QCAT_SIM_SEED", "seven")]))
            .unwrap_err();
        assert!(err.to_string().contains("QCAT_SIM_SEED"));
    }

    #[test]
    fn test_simulator_width_bounded() {
        let err = ExecConfig::default()
            .merge_vars(vars(&[("QCAT_SIM_MAX_QUBITS", "70")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let mut config = ExecConfig::default();
        config.simulator.max_qubits = MAX_SUPPORTED_QUBITS;
        assert!(config.validate().is_ok());
        config.simulator.max_qubits = MAX_SUPPORTED_QUBITS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ExecConfig::default();
        config.ibm.token = Some("ibm-secret".into());
        config.ionq.api_key = Some("ionq-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("ibm-secret"));
        assert!(!debug.contains("ionq-secret"));
    }
}
