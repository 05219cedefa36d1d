use anyhow::Result;
use sqlx::PgPool;
use time::Date;

use crate::db::pagination::{Page, PageParams};
use crate::domain::Observation;

/// Optional filters for the observation listing; set fields combine with AND.
/// The date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
    pub station_id: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

/// Fetch one page of daily observations plus the pre-pagination match count.
///
/// Ordered by (station_id, date) so pagination is stable across pages and
/// across repeated calls over unchanged data.
pub async fn list_observations(
    pool: &PgPool,
    filter: &ObservationFilter,
    page: PageParams,
) -> Result<Page<Observation>> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM weather
        WHERE ($1::TEXT IS NULL OR station_id = $1)
          AND ($2::DATE IS NULL OR date >= $2)
          AND ($3::DATE IS NULL OR date <= $3)
        "#,
    )
    .bind(&filter.station_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, Observation>(
        r#"
        SELECT
            station_id,
            date,
            max_temp_c,
            min_temp_c,
            precip_cm
        FROM weather
        WHERE ($1::TEXT IS NULL OR station_id = $1)
          AND ($2::DATE IS NULL OR date >= $2)
          AND ($3::DATE IS NULL OR date <= $3)
        ORDER BY station_id, date
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(&filter.station_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
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
