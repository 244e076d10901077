use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use inventory_service::api::{self, AppState};
use inventory_service::config::Config;
use inventory_service::db;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let settings = config.settings()?;

    db::run_migrations(&config.database_url)?;
    let pool = db::connect(&config.database_url, config.db_max_connections).await?;

    info!(
        reorder_level = settings.reorder_level,
        overdraw_policy = ?settings.overdraw_policy,
        "Loaded stock settings"
    );

    let app_state = AppState {
        pool,
        settings: Arc::new(settings),
    };

    let app = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!("Inventory service listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
