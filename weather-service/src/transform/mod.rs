use crate::pipeline::{Envelope, PipelineError, Transform};
use time::macros::date;
use weather_client::domain::Observation;

/// Pure validation of an `Observation` record.
///
/// Rules:
/// - precipitation, when present, must be non-negative.
/// - date must be within a broad sanity window [1800-01-01, 2100-01-01].
///
/// Missing fields are legitimate and pass through untouched; only values
/// that are present and impossible get rejected.
pub fn validate_observation(
    env: Envelope<Observation>,
) -> Result<Envelope<Observation>, PipelineError> {
    let o = &env.payload;

    if let Some(p) = o.precip_cm {
        if p < 0.0 {
            return Err(PipelineError::Transform(
                "precipitation must be non-negative".to_string(),
            ));
        }
    }

    let min_date = date!(1800 - 01 - 01);
    let max_date = date!(2100 - 01 - 01);

    if o.date < min_date || o.date > max_date {
        return Err(PipelineError::Transform("date out of allowed range".to_string()));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ObservationValidation;

#[async_trait::async_trait]
impl Transform<Observation, Observation> for ObservationValidation {
    async fn apply(
        &self,
        input: Envelope<Observation>,
    ) -> Result<Envelope<Observation>, PipelineError> {
        match validate_observation(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_observation_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
