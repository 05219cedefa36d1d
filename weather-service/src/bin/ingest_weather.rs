use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::env;
use weather_service::{config::AppConfig, ingest, observability};

/// One-shot feed load: read the station files and insert observations.
///
/// An optional argument overrides the configured feed directory:
/// `ingest_weather [wx_dir]`.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let mut cfg = AppConfig::load()?;
    if let Some(dir) = env::args().nth(1) {
        cfg.ingest.wx_dir = dir;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.url)
        .await
        .context("failed to connect to Postgres")?;

    weather_client::db::ensure_schema(&pool).await?;

    let outcome = ingest::run(&pool, &cfg.ingest).await?;
    tracing::info!(?outcome, "ingest run done");

    Ok(())
}
