use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use weather_service::{config::AppConfig, observability, stats};

/// Recompute the yearly statistics table from the stored observations.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.url)
        .await
        .context("failed to connect to Postgres")?;

    weather_client::db::ensure_schema(&pool).await?;
    stats::recompute(&pool).await?;

    Ok(())
}
