pub mod pagination;
pub mod schema;
pub mod stats_queries;
pub mod weather_queries;

pub use pagination::{InvalidPageParams, Page, PageParams};
pub use schema::ensure_schema;
pub use stats_queries::{list_yearly_stats, StatsFilter};
pub use weather_queries::{list_observations, ObservationFilter};
