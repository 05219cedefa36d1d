use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use weather_service::{api, config::AppConfig, ingest, observability, stats};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        observability::init_metrics(&metrics_cfg.bind_addr);
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.url)
        .await
        .context("failed to connect to Postgres")?;

    weather_client::db::ensure_schema(&pool).await?;

    // Load the feed and refresh yearly statistics before taking queries.
    ingest::run(&pool, &cfg.ingest).await?;
    stats::recompute(&pool).await?;

    let state = api::ApiState {
        pool,
        default_page_size: cfg.api.default_page_size,
        max_page_size: cfg.api.max_page_size,
    };
    api::serve(state, &cfg.api.bind_addr).await
}
