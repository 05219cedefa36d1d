use anyhow::Result;
use sqlx::PgPool;

/// Create the two store tables and their indexes if they do not exist.
///
/// Runs in one transaction and is safe to call on every startup. Each table
/// carries a uniqueness constraint on its natural key; the composite indexes
/// match the primary filter patterns of the query service.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather (
            id          BIGSERIAL PRIMARY KEY,
            station_id  TEXT NOT NULL,
            date        DATE NOT NULL,
            max_temp_c  DOUBLE PRECISION,
            min_temp_c  DOUBLE PRECISION,
            precip_cm   DOUBLE PRECISION,
            CONSTRAINT uq_weather_station_date UNIQUE (station_id, date)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS ix_weather_station_date ON weather (station_id, date)",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_stats (
            id               BIGSERIAL PRIMARY KEY,
            station_id       TEXT NOT NULL,
            year             INT NOT NULL,
            avg_max_temp_c   DOUBLE PRECISION,
            avg_min_temp_c   DOUBLE PRECISION,
            total_precip_cm  DOUBLE PRECISION,
            CONSTRAINT uq_stats_station_year UNIQUE (station_id, year)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS ix_stats_station_year ON weather_stats (station_id, year)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
