//! Shared configuration loader for HybridRec services
//!
//! Configuration is read from environment variables with the `HYBRIDREC_`
//! prefix, after an optional `.env` file has been loaded via dotenvy.
//! Override order: defaults < .env < environment.
//!
//! # Example
//!
//! ```no_run
//! use hybridrec_core::config::{load_dotenv, ConfigLoader, DatabaseConfig, ServiceConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//!
//! let db_config = DatabaseConfig::from_env()?;
//! let service_config = ServiceConfig::from_env()?;
//!
//! db_config.validate()?;
//! service_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::HybridRecError;
use crate::telemetry::LogFormat;
use std::time::Duration;
use url::Url;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a required variable is missing or a
    /// value cannot be parsed.
    fn from_env() -> Result<Self, HybridRecError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if any validation check fails.
    fn validate(&self) -> Result<(), HybridRecError>;
}

/// Database configuration
///
/// # Environment Variables
///
/// - `HYBRIDREC_DATABASE_URL` (required, falls back to `DATABASE_URL`): PostgreSQL connection URL
/// - `HYBRIDREC_DATABASE_MAX_CONNECTIONS` (optional): Maximum pool connections (default: 20)
/// - `HYBRIDREC_DATABASE_MIN_CONNECTIONS` (optional): Minimum pool connections (default: 2)
/// - `HYBRIDREC_DATABASE_CONNECT_TIMEOUT` (optional): Connection timeout in seconds (default: 30)
/// - `HYBRIDREC_DATABASE_IDLE_TIMEOUT` (optional): Idle connection timeout in seconds (default: 600)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle connection timeout duration
    pub idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/recommendation_db".to_string(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, HybridRecError> {
        let url = std::env::var("HYBRIDREC_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                HybridRecError::configuration(
                    "DATABASE_URL or HYBRIDREC_DATABASE_URL must be set",
                    "HYBRIDREC_DATABASE_URL",
                )
            })?;

        let defaults = DatabaseConfig::default();

        let max_connections =
            parse_env_var("HYBRIDREC_DATABASE_MAX_CONNECTIONS", defaults.max_connections)?;
        let min_connections =
            parse_env_var("HYBRIDREC_DATABASE_MIN_CONNECTIONS", defaults.min_connections)?;
        let connect_timeout_secs = parse_env_var("HYBRIDREC_DATABASE_CONNECT_TIMEOUT", 30u64)?;
        let idle_timeout_secs = parse_env_var("HYBRIDREC_DATABASE_IDLE_TIMEOUT", 600u64)?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            idle_timeout: Duration::from_secs(idle_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), HybridRecError> {
        Url::parse(&self.url).map_err(|e| {
            HybridRecError::configuration(
                format!("Invalid DATABASE_URL: {}", e),
                "HYBRIDREC_DATABASE_URL",
            )
        })?;

        if self.max_connections == 0 {
            return Err(HybridRecError::configuration(
                "max_connections must be greater than 0",
                "HYBRIDREC_DATABASE_MAX_CONNECTIONS",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(HybridRecError::configuration(
                format!(
                    "min_connections ({}) cannot exceed max_connections ({})",
                    self.min_connections, self.max_connections
                ),
                "HYBRIDREC_DATABASE_MIN_CONNECTIONS",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(HybridRecError::configuration(
                "connect_timeout must be greater than 0 seconds",
                "HYBRIDREC_DATABASE_CONNECT_TIMEOUT",
            ));
        }

        if self.idle_timeout.as_secs() == 0 {
            return Err(HybridRecError::configuration(
                "idle_timeout must be greater than 0 seconds",
                "HYBRIDREC_DATABASE_IDLE_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// Service configuration
///
/// # Environment Variables
///
/// - `HYBRIDREC_SERVICE_HOST` (optional): Service bind host (default: "0.0.0.0")
/// - `HYBRIDREC_SERVICE_PORT` (optional): Service bind port (default: 8080)
/// - `HYBRIDREC_SERVICE_WORKERS` (optional): Number of worker threads (default: CPU count)
/// - `HYBRIDREC_SERVICE_LOG_LEVEL` (optional): Log level (default: "info")
/// - `HYBRIDREC_LOG_FORMAT` (optional): `json` or `pretty` (default: "json")
/// - `HYBRIDREC_SERVICE_REQUEST_TIMEOUT` (optional): Recommendation timeout in seconds (default: 60)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Upper bound on a single recommendation request, training included
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: num_cpus::get(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ConfigLoader for ServiceConfig {
    fn from_env() -> Result<Self, HybridRecError> {
        let defaults = ServiceConfig::default();

        let host = std::env::var("HYBRIDREC_SERVICE_HOST")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or(defaults.host);

        let port = parse_env_var("HYBRIDREC_SERVICE_PORT", defaults.port)
            .or_else(|_| parse_env_var("PORT", defaults.port))?;

        let workers = parse_env_var("HYBRIDREC_SERVICE_WORKERS", defaults.workers)?;

        let log_level = std::env::var("HYBRIDREC_SERVICE_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(defaults.log_level);

        let log_format = parse_env_var("HYBRIDREC_LOG_FORMAT", defaults.log_format)?;

        let request_timeout_secs = parse_env_var("HYBRIDREC_SERVICE_REQUEST_TIMEOUT", 60u64)?;

        Ok(Self {
            host,
            port,
            workers,
            log_level,
            log_format,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), HybridRecError> {
        if self.port == 0 {
            return Err(HybridRecError::configuration(
                "port must be greater than 0",
                "HYBRIDREC_SERVICE_PORT",
            ));
        }

        if self.workers == 0 {
            return Err(HybridRecError::configuration(
                "workers must be greater than 0",
                "HYBRIDREC_SERVICE_WORKERS",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(HybridRecError::configuration(
                format!(
                    "Invalid log_level '{}'. Must be one of: {}",
                    self.log_level,
                    valid_log_levels.join(", ")
                ),
                "HYBRIDREC_SERVICE_LOG_LEVEL",
            ));
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(HybridRecError::configuration(
                "request_timeout must be greater than 0 seconds",
                "HYBRIDREC_SERVICE_REQUEST_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset
///
/// # Errors
///
/// Returns a `ConfigurationError` if the variable is set but cannot be parsed
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, HybridRecError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                HybridRecError::configuration(format!("Failed to parse {}: {}", key, e), key)
            })
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// Does not fail when the file is missing.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
