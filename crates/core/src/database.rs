//! Shared PostgreSQL connection pool for HybridRec services

use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};
use tracing::info;

/// Shared database connection pool
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create new database pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self, SqlxError> {
        info!(
            max_connections = config.max_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Some(config.idle_timeout))
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Get reference to underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
