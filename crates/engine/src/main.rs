//! HybridRec Service - hybrid movie recommendations over HTTP
//!
//! Port: 8080 (HYBRIDREC_SERVICE_PORT)

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use hybridrec_core::{
    init_tracing, load_dotenv, ConfigLoader, DatabaseConfig, DatabasePool, ServiceConfig,
    TracingConfig,
};
use hybridrec_engine::{configure_routes, AppState, EngineConfig, HybridRecommender, PostgresStore};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let service_config = ServiceConfig::from_env()?;
    service_config.validate()?;

    init_tracing(&TracingConfig {
        service_name: "hybridrec-service".to_string(),
        log_level: service_config.log_level.clone(),
        format: service_config.log_format,
    })?;

    let db_config = DatabaseConfig::from_env()?;
    db_config.validate()?;
    let engine_config = EngineConfig::from_env()?;
    engine_config.validate()?;

    let database = DatabasePool::new(&db_config)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(database.pool())
        .await
        .context("Failed to run database migrations")?;

    let store = Arc::new(PostgresStore::new(database.pool().clone()));
    let recommender = Arc::new(HybridRecommender::new(
        store.clone(),
        store.clone(),
        engine_config,
    ));

    let state = web::Data::new(AppState {
        recommender,
        store: store.clone(),
        time_log: store,
        request_timeout: service_config.request_timeout,
    });

    info!(
        host = %service_config.host,
        port = service_config.port,
        workers = service_config.workers,
        "Starting HybridRec service"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .workers(service_config.workers)
    .bind((service_config.host.as_str(), service_config.port))?
    .run()
    .await?;

    Ok(())
}
