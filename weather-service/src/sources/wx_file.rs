use std::{fs::File, path::PathBuf, time::SystemTime};

use csv::StringRecord;
use futures::Stream;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;
use weather_client::domain::Observation;

use crate::pipeline::{Envelope, PipelineError, Source};

/// Station-file source for daily `Observation` records.
///
/// Reads every `*.txt` file in a directory, one file per station; the
/// station identifier is the file stem. Each line is tab-separated:
///
/// ```text
/// YYYYMMDD <TAB> TMAX <TAB> TMIN <TAB> PRCP
/// ```
///
/// - `TMAX`/`TMIN` are integers in tenths of a degree Celsius
///   (`-22` -> -2.2 °C); `PRCP` is an integer in tenths of a millimeter
///   (`94` -> 0.94 cm). Stored values are degrees Celsius and centimeters.
/// - The missing-value sentinel is `-9999`; an empty field also counts as
///   missing. Missing fields become `None`, never zero.
/// - Malformed lines (bad date, non-sentinel unparseable numeric, fewer
///   than four fields) are skipped with a warning and counted; they never
///   abort the run.
pub struct WxFileSource {
    dir: PathBuf,
}

impl WxFileSource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

const MISSING_SENTINEL: &str = "-9999";
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Parse a tenths-of-unit integer field; the sentinel and empty mean missing.
fn parse_tenths(s: &str) -> Result<Option<i32>, PipelineError> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == MISSING_SENTINEL {
        return Ok(None);
    }
    trimmed
        .parse::<i32>()
        .map(Some)
        .map_err(|e| PipelineError::Source(format!("invalid numeric field '{trimmed}': {e}")))
}

fn record_to_observation(
    record: &StringRecord,
    station_id: &str,
) -> Result<Observation, PipelineError> {
    if record.len() < 4 {
        return Err(PipelineError::Source(format!(
            "expected 4 tab-separated fields, got {}",
            record.len()
        )));
    }

    let date_str = record.get(0).unwrap_or("").trim();
    let date = Date::parse(date_str, DATE_FORMAT)
        .map_err(|e| PipelineError::Source(format!("invalid date '{date_str}': {e}")))?;

    let max_temp_c = parse_tenths(record.get(1).unwrap_or(""))?.map(|v| f64::from(v) / 10.0);
    let min_temp_c = parse_tenths(record.get(2).unwrap_or(""))?.map(|v| f64::from(v) / 10.0);
    // Tenths of a millimeter -> centimeters.
    let precip_cm = parse_tenths(record.get(3).unwrap_or(""))?.map(|v| f64::from(v) / 100.0);

    Ok(Observation {
        station_id: station_id.to_string(),
        date,
        max_temp_c,
        min_temp_c,
        precip_cm,
    })
}

#[async_trait::async_trait]
impl Source<Observation> for WxFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<Observation>, PipelineError>> + Send>>
    {
        // Blocking file reads wrapped in a single async task; the feed is a
        // bounded one-shot batch, not a long-lived stream.
        let dir = self.dir.clone();
        let s = async_stream::try_stream! {
            let entries = std::fs::read_dir(&dir).map_err(|e| {
                PipelineError::Source(format!(
                    "failed to read feed directory {}: {e}",
                    dir.display()
                ))
            })?;

            let mut files: Vec<PathBuf> = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| {
                    PipelineError::Source(format!("failed to list feed directory: {e}"))
                })?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                    files.push(path);
                }
            }
            files.sort();
            tracing::info!(dir = %dir.display(), files = files.len(), "reading station files");

            for path in files {
                let station_id = match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => {
                        tracing::warn!(file = %path.display(), "skipping file with unusable name");
                        continue;
                    }
                };

                let file = File::open(&path).map_err(|e| {
                    PipelineError::Source(format!("failed to open {}: {e}", path.display()))
                })?;
                let mut rdr = csv::ReaderBuilder::new()
                    .delimiter(b'\t')
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(file);

                for (idx, result) in rdr.records().enumerate() {
                    metrics::counter!("wx_lines_total").increment(1);

                    let record = match result {
                        Ok(r) => r,
                        Err(e) => {
                            metrics::counter!("wx_parse_errors_total").increment(1);
                            tracing::warn!(
                                file = %path.display(),
                                line = idx + 1,
                                error = %e,
                                "skipping unreadable line"
                            );
                            continue;
                        }
                    };

                    let obs = match record_to_observation(&record, &station_id) {
                        Ok(o) => o,
                        Err(e) => {
                            metrics::counter!("wx_parse_errors_total").increment(1);
                            tracing::warn!(
                                file = %path.display(),
                                line = idx + 1,
                                error = %e,
                                "skipping malformed record"
                            );
                            continue;
                        }
                    };

                    yield Envelope {
                        payload: obs,
                        received_at: SystemTime::now(),
                    };
                }
            }
        };

        Box::pin(s)
    }
}
