//! Client library for the weather history store.
//!
//! Holds the row types for the `weather` and `weather_stats` tables and the
//! read-side query helpers used by the service and by downstream Rust
//! consumers (dashboards, tooling). Enable the `serde` feature to get
//! `Serialize`/`Deserialize` on the domain types.

pub mod db;
pub mod domain;
