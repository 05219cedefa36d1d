//! End-to-end checks against a real Postgres server.
//!
//! Ignored by default. Point `DATABASE_URL` at a scratch database and run
//! them serially; every test truncates the tables it uses:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/weather_test \
//!     cargo test --test db_pipeline -- --ignored --test-threads=1
//! ```

use std::path::Path;

use sqlx::postgres::{PgPool, PgPoolOptions};
use time::macros::date;
use time::Date;
use weather_client::db::{self, ObservationFilter, PageParams, StatsFilter};
use weather_service::config::IngestConfig;
use weather_service::ingest::{self, IngestOutcome};
use weather_service::stats;

async fn test_pool() -> PgPool {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("failed to connect to test database");

    db::ensure_schema(&pool).await.expect("failed to apply schema");
    sqlx::query("TRUNCATE weather, weather_stats")
        .execute(&pool)
        .await
        .expect("failed to reset tables");

    pool
}

fn feed_config(dir: &Path, force: bool) -> IngestConfig {
    IngestConfig {
        wx_dir: dir.display().to_string(),
        batch_size: 100,
        force,
    }
}

async fn insert_obs(
    pool: &PgPool,
    station_id: &str,
    date: Date,
    max_temp_c: Option<f64>,
    min_temp_c: Option<f64>,
    precip_cm: Option<f64>,
) {
    sqlx::query(
        "INSERT INTO weather (station_id, date, max_temp_c, min_temp_c, precip_cm) \
         VALUES ($1, $2, $3, $4, $5) ON CONFLICT (station_id, date) DO NOTHING",
    )
    .bind(station_id)
    .bind(date)
    .bind(max_temp_c)
    .bind(min_temp_c)
    .bind(precip_cm)
    .execute(pool)
    .await
    .expect("failed to insert fixture row");
}

async fn row_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM weather")
        .fetch_one(pool)
        .await
        .expect("failed to count rows")
}

fn page(n: i64, size: i64) -> PageParams {
    PageParams::new(n, size, 500).expect("valid page params")
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn ingest_is_idempotent_across_runs() {
    let pool = test_pool().await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("A1.txt"),
        "19850101\t-22\t-128\t94\n19850102\t156\t33\t-9999\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("B2.txt"), "19850101\t100\t50\t0\n").unwrap();

    let outcome = ingest::run(&pool, &feed_config(dir.path(), false)).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Completed);
    assert_eq!(row_count(&pool).await, 3);

    // Data exists, so a second run without force never touches the feed.
    let outcome = ingest::run(&pool, &feed_config(dir.path(), false)).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Skipped { existing_rows: 3 });

    // A forced re-run reads the feed again but inserts nothing new.
    let outcome = ingest::run(&pool, &feed_config(dir.path(), true)).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Completed);
    assert_eq!(row_count(&pool).await, 3);
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn existing_rows_keep_their_values_on_conflict() {
    let pool = test_pool().await;

    insert_obs(&pool, "A1", date!(1985 - 01 - 01), Some(1.5), Some(0.5), Some(0.1)).await;

    // Same natural key in the feed, different values, plus an in-feed duplicate.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("A1.txt"),
        "19850101\t999\t999\t999\n19850102\t20\t10\t0\n19850102\t888\t888\t888\n",
    )
    .unwrap();

    let outcome = ingest::run(&pool, &feed_config(dir.path(), true)).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Completed);
    assert_eq!(row_count(&pool).await, 2);

    let rows = db::list_observations(&pool, &ObservationFilter::default(), page(1, 10))
        .await
        .unwrap();
    assert_eq!(rows.total, 2);
    // The pre-existing row is untouched.
    assert_eq!(rows.items[0].date, date!(1985 - 01 - 01));
    assert_eq!(rows.items[0].max_temp_c, Some(1.5));
    // The first of the duplicated feed lines wins.
    assert_eq!(rows.items[1].date, date!(1985 - 01 - 02));
    assert_eq!(rows.items[1].max_temp_c, Some(2.0));
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn missing_feed_directory_fails_the_run() {
    let pool = test_pool().await;

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = ingest::run(&pool, &feed_config(&missing, false))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ingest pipeline failed"));
    assert_eq!(row_count(&pool).await, 0);
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn malformed_feed_lines_are_dropped_not_fatal() {
    let pool = test_pool().await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("A1.txt"),
        "19850101\t10\t5\t0\nnot-a-date\t10\t5\t0\n19850102\t20\t10\t-1\n19850103\t30\t15\t0\n",
    )
    .unwrap();

    // Line 2 fails parsing, line 3 fails validation (negative precipitation);
    // both are skipped and the rest of the feed still lands.
    let outcome = ingest::run(&pool, &feed_config(dir.path(), false)).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Completed);

    let rows = db::list_observations(&pool, &ObservationFilter::default(), page(1, 10))
        .await
        .unwrap();
    let dates: Vec<Date> = rows.items.iter().map(|o| o.date).collect();
    assert_eq!(dates, vec![date!(1985 - 01 - 01), date!(1985 - 01 - 03)]);
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn yearly_stats_ignore_missing_values() {
    let pool = test_pool().await;

    insert_obs(&pool, "A1", date!(1985 - 01 - 01), Some(10.0), Some(-5.0), None).await;
    insert_obs(&pool, "A1", date!(1985 - 06 - 01), Some(20.0), None, None).await;
    insert_obs(&pool, "A1", date!(1985 - 12 - 31), None, Some(-1.0), None).await;
    insert_obs(&pool, "A1", date!(1986 - 01 - 01), Some(8.0), Some(2.0), Some(0.25)).await;

    let station_years = stats::recompute(&pool).await.unwrap();
    assert_eq!(station_years, 2);

    let stats_page = db::list_yearly_stats(&pool, &StatsFilter::default(), page(1, 10))
        .await
        .unwrap();
    assert_eq!(stats_page.total, 2);

    let y1985 = &stats_page.items[0];
    assert_eq!(y1985.year, 1985);
    // Averages skip missing inputs instead of treating them as zero.
    assert!((y1985.avg_max_temp_c.unwrap() - 15.0).abs() < 1e-9);
    assert!((y1985.avg_min_temp_c.unwrap() - (-3.0)).abs() < 1e-9);
    // Every precipitation input missing leaves the total missing.
    assert_eq!(y1985.total_precip_cm, None);

    let y1986 = &stats_page.items[1];
    assert_eq!(y1986.year, 1986);
    assert!((y1986.total_precip_cm.unwrap() - 0.25).abs() < 1e-9);

    // Recomputing on unchanged data rewrites the same values.
    let station_years = stats::recompute(&pool).await.unwrap();
    assert_eq!(station_years, 2);
    let again = db::list_yearly_stats(&pool, &StatsFilter::default(), page(1, 10))
        .await
        .unwrap();
    assert_eq!(again.items, stats_page.items);
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn pagination_walks_every_row_exactly_once() {
    let pool = test_pool().await;

    for day in 1..=7u8 {
        insert_obs(&pool, "A1", date!(1985 - 01 - 01).replace_day(day).unwrap(), Some(1.0), None, None)
            .await;
    }

    let mut seen: Vec<Date> = Vec::new();
    for n in 1..=3 {
        let p = db::list_observations(&pool, &ObservationFilter::default(), page(n, 3))
            .await
            .unwrap();
        assert_eq!(p.total, 7);
        assert_eq!(p.page, n);
        seen.extend(p.items.iter().map(|o| o.date));
    }

    let expected: Vec<Date> = (1..=7u8)
        .map(|d| date!(1985 - 01 - 01).replace_day(d).unwrap())
        .collect();
    assert_eq!(seen, expected);

    // Past the last page the envelope still reports the full total.
    let p = db::list_observations(&pool, &ObservationFilter::default(), page(4, 3))
        .await
        .unwrap();
    assert_eq!(p.total, 7);
    assert!(p.items.is_empty());
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn filters_combine_with_and() {
    let pool = test_pool().await;

    insert_obs(&pool, "A1", date!(1985 - 01 - 01), Some(1.0), None, None).await;
    insert_obs(&pool, "A1", date!(1985 - 02 - 01), Some(2.0), None, None).await;
    insert_obs(&pool, "A1", date!(1986 - 01 - 01), Some(3.0), None, None).await;
    insert_obs(&pool, "B2", date!(1985 - 01 - 15), Some(4.0), None, None).await;

    let filter = ObservationFilter {
        station_id: Some("A1".to_string()),
        start_date: Some(date!(1985 - 01 - 01)),
        end_date: Some(date!(1985 - 12 - 31)),
    };
    let p = db::list_observations(&pool, &filter, page(1, 10)).await.unwrap();
    assert_eq!(p.total, 2);
    assert!(p.items.iter().all(|o| o.station_id == "A1"));

    // An inverted range is not an error, just empty.
    let filter = ObservationFilter {
        station_id: None,
        start_date: Some(date!(1986 - 01 - 01)),
        end_date: Some(date!(1985 - 01 - 01)),
    };
    let p = db::list_observations(&pool, &filter, page(1, 10)).await.unwrap();
    assert_eq!(p.total, 0);

    stats::recompute(&pool).await.unwrap();
    let filter = StatsFilter {
        station_id: Some("A1".to_string()),
        year: Some(1985),
    };
    let p = db::list_yearly_stats(&pool, &filter, page(1, 10)).await.unwrap();
    assert_eq!(p.total, 1);
    assert_eq!(p.items[0].station_id, "A1");
    assert_eq!(p.items[0].year, 1985);

    let filter = StatsFilter {
        station_id: Some("A1".to_string()),
        year: Some(1999),
    };
    let p = db::list_yearly_stats(&pool, &filter, page(1, 10)).await.unwrap();
    assert_eq!(p.total, 0);
}

#[tokio::test]
#[ignore = "requires a Postgres server (DATABASE_URL)"]
async fn observations_default_to_station_then_date_order() {
    let pool = test_pool().await;

    insert_obs(&pool, "B2", date!(1985 - 01 - 01), None, None, None).await;
    insert_obs(&pool, "A1", date!(1985 - 01 - 02), None, None, None).await;
    insert_obs(&pool, "A1", date!(1985 - 01 - 01), None, None, None).await;

    let p = db::list_observations(&pool, &ObservationFilter::default(), page(1, 10))
        .await
        .unwrap();
    let keys: Vec<(String, Date)> = p
        .items
        .iter()
        .map(|o| (o.station_id.clone(), o.date))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("A1".to_string(), date!(1985 - 01 - 01)),
            ("A1".to_string(), date!(1985 - 01 - 02)),
            ("B2".to_string(), date!(1985 - 01 - 01)),
        ]
    );
}
