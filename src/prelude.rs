//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::adapters::Adapter;
pub use crate::cache::{CacheStore, DiskStore, MemoryStore, QueryCache};
pub use crate::config::{CacheConfig, ConnectionConfig, EngineOptions, EngineOptionsBuilder};
pub use crate::engine::{CallSite, Database, QueryRecord, StatementKind, TraceRecord};
pub use crate::error::SqlDbalError;
pub use crate::query_builder::{Order, QueryAndParams, QueryBuilder, SelectBuilder, Where};
pub use crate::results::{
    ColumnField, ColumnInfo, CustomDbRow, FetchedRow, FetchedRows, Materializer, ResultSet,
};
pub use crate::schema::{AlterOp, ColumnDescriptor, DataType, SchemaBuilder};
pub use crate::types::{DatabaseType, OutputFormat, PlaceholderStyle, RowValues};

#[cfg(feature = "mssql")]
pub use crate::mssql::MssqlAdapter;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresAdapter;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteAdapter;
