use std::sync::Arc;

use tracing::{info, warn};

pub mod adapters;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod ports;
pub mod telemetry;

use crate::{
    adapters::{
        catalog::memory::MemoryCatalog, database::memory::MemoryDatabase,
        notification::logging::TracingNotifier,
    },
    commands::DomainLogic,
    config::AppConfig,
    error::AppError,
};

/// Load configuration, wire the adapters and serve the HTTP API until shutdown
pub async fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let catalog = match &config.catalog_path {
        Some(path) => {
            let catalog = MemoryCatalog::load(path)?;
            info!(path = %path.display(), plans = catalog.plan_count(), "catalog loaded");
            catalog
        }
        None => {
            warn!("APP_CATALOG_PATH is not set, starting with an empty catalog");
            MemoryCatalog::default()
        }
    };
    let catalog = Arc::new(catalog);
    let database = Arc::new(MemoryDatabase::default());
    let logic = DomainLogic::new(
        catalog.clone(),
        catalog,
        database.clone(),
        database,
        Arc::new(TracingNotifier),
    );
    let app = http::router(logic);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "club enrollment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
