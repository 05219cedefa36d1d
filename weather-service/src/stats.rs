use std::time::Instant;

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;

/// Recompute yearly statistics for every station/year in `weather`.
///
/// A single INSERT .. SELECT with an upsert on (station_id, year): one
/// statement, so readers never observe a half-refreshed table. `AVG` and
/// `SUM` ignore NULL inputs; a station/year whose inputs are all missing
/// gets a NULL statistic rather than zero. Re-running on unchanged data
/// rewrites each row with the same values.
pub async fn recompute(pool: &PgPool) -> Result<u64> {
    let started = Instant::now();

    let upsert_sql = r#"
        INSERT INTO weather_stats (station_id, year, avg_max_temp_c, avg_min_temp_c, total_precip_cm)
        SELECT
            station_id,
            EXTRACT(YEAR FROM date)::INT AS year,
            AVG(max_temp_c)              AS avg_max_temp_c,
            AVG(min_temp_c)              AS avg_min_temp_c,
            SUM(precip_cm)               AS total_precip_cm
        FROM weather
        GROUP BY station_id, EXTRACT(YEAR FROM date)::INT
        ON CONFLICT (station_id, year) DO UPDATE SET
            avg_max_temp_c  = EXCLUDED.avg_max_temp_c,
            avg_min_temp_c  = EXCLUDED.avg_min_temp_c,
            total_precip_cm = EXCLUDED.total_precip_cm;
        "#;

    let result = sqlx::query(upsert_sql)
        .execute(pool)
        .await
        .context("failed to recompute yearly statistics")?;

    let station_years = result.rows_affected();
    tracing::info!(
        station_years,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "yearly statistics recomputed"
    );

    Ok(station_years)
}
