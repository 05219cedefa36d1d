/// Yearly aggregate for one station, derived from `Observation` rows.
///
/// `(station_id, year)` is unique in the store. Averages and the total are
/// computed over non-missing daily values only; a station-year with no
/// non-missing values for a field carries `None` there, never zero.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct YearlyStat {
    pub station_id: String,
    pub year: i32,
    pub avg_max_temp_c: Option<f64>,
    pub avg_min_temp_c: Option<f64>,
    pub total_precip_cm: Option<f64>,
}
