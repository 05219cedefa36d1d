pub mod api;
pub mod config;
pub mod ingest;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod stats;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
