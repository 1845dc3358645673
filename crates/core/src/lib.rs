//! # HybridRec Core
//!
//! Shared infrastructure for the HybridRec movie recommendation services.
//!
//! ## Modules
//!
//! - `config`: Configuration loading and validation
//! - `database`: Shared PostgreSQL connection pool
//! - `error`: Error types and handling
//! - `telemetry`: Structured logging setup
//! - `validation`: Boundary validation for ratings and request parameters

pub mod config;
pub mod database;
pub mod error;
pub mod telemetry;
pub mod validation;

pub use config::{load_dotenv, parse_env_var, ConfigLoader, DatabaseConfig, ServiceConfig};
pub use database::DatabasePool;
pub use error::HybridRecError;
pub use telemetry::{init_tracing, pipeline_span, LogFormat, TelemetryError, TracingConfig};

/// Result type alias for HybridRec core operations
pub type Result<T> = std::result::Result<T, HybridRecError>;
