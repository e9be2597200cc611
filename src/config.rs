//! Runtime configuration from environment variables.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the ledger server and CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Origin allowed by CORS
    pub frontend_origin: String,

    /// How long a writer waits for another writer's lock
    pub busy_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `ITEM_LEDGER_DB_PATH` (default: item-ledger.db)
    /// - `ITEM_LEDGER_BIND` (default: 0.0.0.0:$PORT)
    /// - `PORT` (default: 8080)
    /// - `FRONTEND_ORIGIN` (default: http://localhost:5173)
    /// - `ITEM_LEDGER_BUSY_TIMEOUT_MS` (default: 5000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port: u16 = var("PORT", "8080")
            .parse()
            .context("PORT must be a port number")?;

        let busy_timeout_ms: u64 = var("ITEM_LEDGER_BUSY_TIMEOUT_MS", "5000")
            .parse()
            .context("ITEM_LEDGER_BUSY_TIMEOUT_MS must be a whole number of milliseconds")?;

        Ok(Config {
            db_path: PathBuf::from(var("ITEM_LEDGER_DB_PATH", "item-ledger.db")),
            bind_addr: var("ITEM_LEDGER_BIND", &format!("0.0.0.0:{port}")),
            frontend_origin: var("FRONTEND_ORIGIN", "http://localhost:5173"),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        })
    }
}
