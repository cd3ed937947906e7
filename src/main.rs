mod api;
mod config;
mod db;
mod error;
mod gateway;
mod ledger;
mod matcher;
mod odds;
mod service;
mod types;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::Repo;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::ledger::Ledger;
use crate::service::FootballService;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await?;
    db::MIGRATOR.run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Core wiring: gateway → matcher/normalizer → repository + ledger ---
    let bookmaker = cfg.bookmaker.clone();
    let api_port = cfg.api_port;
    let gateway = Gateway::new(cfg)?;
    let repo = Repo::new(pool.clone());
    let service = Arc::new(FootballService::new(gateway, repo, bookmaker));
    let ledger = Ledger::new(pool);

    // --- HTTP API server ---
    let state = ApiState { service, ledger };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{api_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
