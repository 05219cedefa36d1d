use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;
use weather_client::db::{
    list_observations, list_yearly_stats, InvalidPageParams, ObservationFilter, Page, PageParams,
    StatsFilter,
};
use weather_client::domain::{Observation, YearlyStat};

/// Read-only query API over the `weather` and `weather_stats` tables.
///
/// Both list endpoints share the same response envelope:
///
/// ```json
/// { "total": 123, "page": 1, "page_size": 25, "items": [ ... ] }
/// ```
///
/// Filters are equality/range conditions combined with AND; out-of-range
/// page parameters are rejected with 400 rather than clamped. Numeric
/// values are rounded to two decimals at the response edge only; the
/// stored values keep full precision.
#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/weather/stats", get(get_weather_stats))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve the query API until the process exits.
pub async fn serve(state: ApiState, bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid api bind address '{bind_addr}'"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind query API listener on {addr}"))?;
    tracing::info!(%addr, "query API listening");

    axum::serve(listener, router(state).into_make_service())
        .await
        .context("query API server error")
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<InvalidPageParams> for ApiError {
    fn from(e: InvalidPageParams) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: msg })).into_response()
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "storage error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "storage unavailable".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    station_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    station_id: Option<String>,
    year: Option<i32>,
    page: Option<i64>,
    page_size: Option<i64>,
}

const DATE_PARAM_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

fn parse_date_param(name: &str, value: Option<&str>) -> Result<Option<Date>, ApiError> {
    match value {
        None => Ok(None),
        Some(s) => Date::parse(s, DATE_PARAM_FORMAT).map(Some).map_err(|_| {
            ApiError::BadRequest(format!("invalid {name} '{s}': expected YYYY-MM-DD"))
        }),
    }
}

fn resolve_page(
    page: Option<i64>,
    page_size: Option<i64>,
    default_page_size: i64,
    max_page_size: i64,
) -> Result<PageParams, ApiError> {
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or(default_page_size);
    Ok(PageParams::new(page, page_size, max_page_size)?)
}

/// Round half away from zero to two decimals.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round2_opt(v: Option<f64>) -> Option<f64> {
    v.map(round2)
}

#[derive(Debug, Serialize)]
pub struct ObservationItem {
    station_id: String,
    date: Date,
    max_temp_c: Option<f64>,
    min_temp_c: Option<f64>,
    precip_cm: Option<f64>,
}

impl From<Observation> for ObservationItem {
    fn from(o: Observation) -> Self {
        Self {
            station_id: o.station_id,
            date: o.date,
            max_temp_c: round2_opt(o.max_temp_c),
            min_temp_c: round2_opt(o.min_temp_c),
            precip_cm: round2_opt(o.precip_cm),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct YearlyStatItem {
    station_id: String,
    year: i32,
    avg_max_temp_c: Option<f64>,
    avg_min_temp_c: Option<f64>,
    total_precip_cm: Option<f64>,
}

impl From<YearlyStat> for YearlyStatItem {
    fn from(s: YearlyStat) -> Self {
        Self {
            station_id: s.station_id,
            year: s.year,
            avg_max_temp_c: round2_opt(s.avg_max_temp_c),
            avg_min_temp_c: round2_opt(s.avg_min_temp_c),
            total_precip_cm: round2_opt(s.total_precip_cm),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageEnvelope<T> {
    total: i64,
    page: i64,
    page_size: i64,
    items: Vec<T>,
}

fn envelope<T, U: From<T>>(page: Page<T>) -> PageEnvelope<U> {
    PageEnvelope {
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        items: page.items.into_iter().map(U::from).collect(),
    }
}

async fn get_weather(
    State(state): State<ApiState>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<PageEnvelope<ObservationItem>>, ApiError> {
    metrics::counter!("http_weather_requests_total").increment(1);

    let page = resolve_page(
        params.page,
        params.page_size,
        state.default_page_size,
        state.max_page_size,
    )?;
    let filter = ObservationFilter {
        station_id: params.station_id,
        start_date: parse_date_param("start_date", params.start_date.as_deref())?,
        end_date: parse_date_param("end_date", params.end_date.as_deref())?,
    };

    let result = list_observations(&state.pool, &filter, page).await?;
    Ok(Json(envelope(result)))
}

async fn get_weather_stats(
    State(state): State<ApiState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<PageEnvelope<YearlyStatItem>>, ApiError> {
    metrics::counter!("http_weather_stats_requests_total").increment(1);

    let page = resolve_page(
        params.page,
        params.page_size,
        state.default_page_size,
        state.max_page_size,
    )?;
    let filter = StatsFilter {
        station_id: params.station_id,
        year: params.year,
    };

    let result = list_yearly_stats(&state.pool, &filter, page).await?;
    Ok(Json(envelope(result)))
}

async fn health() -> &'static str {
    "ok"
}
