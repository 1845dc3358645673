//! Structured logging setup
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! JSON or a human-readable formatting layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use hybridrec_core::telemetry::{init_tracing, LogFormat, TracingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TracingConfig {
//!         service_name: "hybridrec-service".to_string(),
//!         log_level: "info".to_string(),
//!         format: LogFormat::Json,
//!     };
//!
//!     init_tracing(&config)?;
//!     Ok(())
//! }
//! ```

pub mod tracing;

pub use self::tracing::{init_tracing, pipeline_span, LogFormat, TelemetryError, TracingConfig};
