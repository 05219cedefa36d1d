use futures::StreamExt;
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};
use weather_client::domain::Observation;

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Batched Postgres sink for daily observations.
///
/// Rows are inserted with `ON CONFLICT (station_id, date) DO NOTHING`, so a
/// record whose natural key already exists is silently skipped and the stored
/// values stay untouched. Upstream validation rejects are skipped and logged;
/// any other upstream error means the feed itself is broken and aborts the
/// run, as does a failed batch write. There is no automatic retry, the whole
/// ingest is re-runnable instead.
pub struct PostgresSink {
    pool: PgPool,
    batch_size: usize,
}

impl PostgresSink {
    pub fn new(pool: PgPool, batch_size: usize) -> Self {
        Self { pool, batch_size }
    }

    async fn flush_batch(&self, batch: &[Envelope<Observation>]) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        match self.insert_batch(batch).await {
            Ok(()) => {
                let counter = metrics::counter!("weather_ingested_records_total");
                counter.increment(batch.len() as u64);

                // Approximate end-to-end latency from earliest received_at to now.
                if let Some(min_received) = batch.iter().map(|e| e.received_at).min() {
                    if let Ok(dur) = std::time::SystemTime::now().duration_since(min_received) {
                        let hist = metrics::histogram!("ingest_end_to_end_latency_seconds");
                        hist.record(dur.as_secs_f64());
                    }
                }

                Ok(())
            }
            Err(e) => {
                let first = &batch[0].payload;
                tracing::error!(
                    error = %e,
                    batch_len = batch.len(),
                    first_station = %first.station_id,
                    first_date = %first.date,
                    "postgres sink flush failed"
                );
                metrics::counter!("weather_sink_errors_total").increment(1);
                Err(PipelineError::Sink(e.to_string()))
            }
        }
    }

    async fn insert_batch(&self, batch: &[Envelope<Observation>]) -> Result<(), sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO weather (station_id, date, max_temp_c, min_temp_c, precip_cm) ",
        );

        builder.push_values(batch, |mut b, env| {
            let o = &env.payload;
            b.push_bind(&o.station_id)
                .push_bind(o.date)
                .push_bind(o.max_temp_c)
                .push_bind(o.min_temp_c)
                .push_bind(o.precip_cm);
        });
        builder.push(" ON CONFLICT (station_id, date) DO NOTHING");

        let query = builder.build();
        query.execute(&self.pool).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Sink<Observation> for PostgresSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Observation>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut buffer: Vec<Envelope<Observation>> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e @ PipelineError::Transform(_)) => {
                    // Record-level rejection from validation; skip it and keep going.
                    tracing::warn!(error = %e, "skipping rejected record");
                    continue;
                }
                Err(e) => {
                    // The source only emits `Err` for infrastructure faults
                    // (unreadable directory, unopenable file), never for bad
                    // records; those must end the run.
                    tracing::error!(error = %e, "upstream failure, aborting run");
                    return Err(e);
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.flush_batch(&buffer).await?;
        }

        Ok(())
    }
}
