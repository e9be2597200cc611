// Item Ledger - Web Server
// REST API with Axum over the SQLite-backed ledger

use anyhow::{Context, Result};
use item_ledger::api::{cors_layer, router};
use item_ledger::{Config, Ledger};
use tokio::net::TcpListener;
use tracing::info;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env()?;

    let ledger = Ledger::open_with_timeout(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Failed to open ledger at {}", config.db_path.display()))?;
    info!("ledger opened: {}", config.db_path.display());

    let app = router(ledger).layer(cors_layer(&config.frontend_origin)?);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("item ledger listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
