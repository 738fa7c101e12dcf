//! Catalog API Server
//!
//! REST API server for the catalog backend.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use catalog_api::{auth::PasswordConfig, auth::PgCredentialStore, create_router, state::AppState};
use catalog_core::config::{AppConfig, LoggingConfig};
use catalog_core::PgCatalogStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "catalog_api={level},catalog_core={level},audit=info,tower_http=info",
            level = logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("invalid configuration")?;
    init_tracing(&config.logging);

    let catalog = PgCatalogStore::new(&config.database.url, config.database.pool_size)
        .await
        .context("failed to connect to PostgreSQL")?;
    let users = PgCredentialStore::new(catalog.pool().clone());

    let addr = config.server.bind_addr();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(users),
        Arc::new(catalog),
        PasswordConfig::default(),
    )?);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Catalog API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
