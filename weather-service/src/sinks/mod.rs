pub mod postgres;

pub use postgres::PostgresSink;
