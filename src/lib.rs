//! A small database abstraction layer: one synchronous query engine with
//! result buffering, a TTL query cache, error capture and debugging, in front
//! of thin per-vendor adapters.
//!
//! Backends are cargo features: `sqlite` (default), `postgres`, `mssql`. The
//! schema and query builders cover `MySQL`, `PostgreSQL`, `SQLite`, SQL Server,
//! Oracle and Sybase whether or not an adapter is compiled in.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod escape;
pub mod prelude;
pub mod profiler;
pub mod query_builder;
pub mod registry;
pub mod results;
pub mod schema;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use engine::Database;
pub use error::SqlDbalError;
pub use types::{DatabaseType, OutputFormat, RowValues};
