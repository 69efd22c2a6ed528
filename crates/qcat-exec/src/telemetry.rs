//! Tracing setup.
//!
//! Console output for development, JSON structured logging otherwise.
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{ExecConfig, LoggingConfig};
use crate::error::{ExecError, ExecResult};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output.
    Console,
    /// JSON structured logging.
    Json,
}

impl TracingFormat {
    /// Parse a format name; anything but `json` is console output.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            TracingFormat::Json
        } else {
            TracingFormat::Console
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> ExecResult<()> {
    let fmt_layer = match TracingFormat::from_name(&config.format) {
        TracingFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        TracingFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ExecError::Telemetry(e.to_string()))?;

    tracing::debug!(level = %config.level, format = %config.format, "tracing initialized");
    Ok(())
}

/// Install tracing from `QCAT_LOG_LEVEL`, `QCAT_LOG_FORMAT` and `RUST_LOG`.
pub fn init_default_tracing() -> ExecResult<()> {
    let config = ExecConfig::from_env()?;
    init_tracing(&config.logging)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(TracingFormat::from_name("json"), TracingFormat::Json);
        assert_eq!(TracingFormat::from_name("JSON"), TracingFormat::Json);
        assert_eq!(TracingFormat::from_name("console"), TracingFormat::Console);
        assert_eq!(TracingFormat::from_name("pretty"), TracingFormat::Console);
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(ExecError::Telemetry(_))
        ));
    }
}
