use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "mssql")]
use tiberius;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum SqlDbalError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Database selection error: {0}")]
    SelectionError(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {message} [query: {query}]")]
    ExecutionError { message: String, query: String },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlDbalError {
    /// Wrap a driver failure together with the statement that caused it.
    pub fn execution(err: impl std::fmt::Display, query: &str) -> Self {
        SqlDbalError::ExecutionError {
            message: err.to_string(),
            query: query.to_string(),
        }
    }
}
