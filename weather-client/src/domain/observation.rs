use time::Date;

/// One daily reading for one station.
///
/// `(station_id, date)` is unique in the store; the temperature and
/// precipitation fields are `None` where the source marked them missing.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    pub station_id: String,
    pub date: Date,
    pub max_temp_c: Option<f64>,
    pub min_temp_c: Option<f64>,
    pub precip_cm: Option<f64>,
}
