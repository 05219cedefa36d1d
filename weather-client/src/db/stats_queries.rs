use anyhow::Result;
use sqlx::PgPool;

use crate::db::pagination::{Page, PageParams};
use crate::domain::YearlyStat;

/// Optional filters for the yearly statistics listing; set fields combine
/// with AND.
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub station_id: Option<String>,
    pub year: Option<i32>,
}

/// Fetch one page of yearly aggregates plus the pre-pagination match count,
/// ordered by (station_id, year).
pub async fn list_yearly_stats(
    pool: &PgPool,
    filter: &StatsFilter,
    page: PageParams,
) -> Result<Page<YearlyStat>> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM weather_stats
        WHERE ($1::TEXT IS NULL OR station_id = $1)
          AND ($2::INT IS NULL OR year = $2)
        "#,
    )
    .bind(&filter.station_id)
    .bind(filter.year)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, YearlyStat>(
        r#"
        SELECT
            station_id,
            year,
            avg_max_temp_c,
            avg_min_temp_c,
            total_precip_cm
        FROM weather_stats
        WHERE ($1::TEXT IS NULL OR station_id = $1)
          AND ($2::INT IS NULL OR year = $2)
        ORDER BY station_id, year
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&filter.station_id)
    .bind(filter.year)
    .bind(page.page_size())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page {
        total,
        page: page.page(),
        page_size: page.page_size(),
        items,
    })
}
