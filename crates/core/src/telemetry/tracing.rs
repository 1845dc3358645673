//! Tracing subscriber configuration and initialization

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{span, Level, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log format: {0} (expected 'json' or 'pretty')")]
    InvalidFormat(String),

    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, String),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(TelemetryError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
        }
    }
}

/// Configuration for the process-wide tracing subscriber
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name recorded on the startup event
    pub service_name: String,

    /// Default filter directive when `RUST_LOG` is not set
    pub log_level: String,

    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "hybridrec".to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Must be called once at application startup. `RUST_LOG` takes precedence
/// over `config.log_level`.
///
/// # Errors
///
/// Returns error if the filter directive is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            TelemetryError::InvalidFilter(config.log_level.clone(), e.to_string())
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init(),
    }
    .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        format = %config.format,
        "Tracing initialized"
    );

    Ok(())
}

/// Create a span covering one recommendation pipeline run
///
/// # Example
///
/// ```rust
/// use hybridrec_core::telemetry::pipeline_span;
///
/// let span = pipeline_span("hybrid", 42);
/// let _guard = span.enter();
/// ```
pub fn pipeline_span(pipeline: &str, user_id: i64) -> Span {
    span!(
        Level::INFO,
        "recommendation.pipeline",
        pipeline = %pipeline,
        user_id = user_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "hybridrec");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_pipeline_span_creation() {
        let span = pipeline_span("content", 7);
        let _guard = span.enter();
    }
}
