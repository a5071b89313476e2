use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlDbalError;

/// Credentials and target for one connection.
///
/// Kept by the engine after a successful connect so a dropped connection can
/// be re-established once without the caller supplying them again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Database name, or the file path for `SQLite`.
    pub database: Option<String>,
    pub charset: Option<String>,
}

impl ConnectionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for a `SQLite` database file (or `:memory:`).
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::default().with_database(path)
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Fetch a required string field.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ConfigError` naming the field when it is missing or empty.
    pub fn require<'a>(
        field: &'static str,
        value: Option<&'a String>,
    ) -> Result<&'a str, SqlDbalError> {
        match value {
            Some(v) if !v.is_empty() => Ok(v.as_str()),
            _ => Err(SqlDbalError::ConfigError(format!("{field} is required"))),
        }
    }

    /// Fail unless host, user and password are all present.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ConfigError` for the first missing field.
    pub fn require_server_credentials(&self) -> Result<(), SqlDbalError> {
        Self::require("host", self.host.as_ref())?;
        Self::require("user", self.user.as_ref())?;
        Self::require("password", self.password.as_ref())?;
        Ok(())
    }
}

/// Query cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries older than this are treated as absent.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// Cache results of read statements.
    pub cache_queries: bool,
    /// Cache outcomes of mutating statements (off by default: a cached INSERT is not re-run).
    pub cache_inserts: bool,
    /// Directory for the on-disk store; `None` keeps entries in memory.
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            cache_queries: true,
            cache_inserts: false,
            directory: None,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Behaviour switches for a [`Database`](crate::Database).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Emit registered errors as `tracing` warnings.
    pub show_errors: bool,
    /// Query cache; `None` disables caching.
    pub cache: Option<CacheConfig>,
    /// Builders bind parameters instead of inlining escaped literals.
    pub prepare: bool,
    /// Keep a trace record for every query.
    pub trace: bool,
    /// Rewrite MySQL-flavoured SQL before sending it to SQL Server / Sybase.
    pub convert_mysql_to_mssql: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            show_errors: true,
            cache: None,
            prepare: false,
            trace: false,
            convert_mysql_to_mssql: false,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn builder() -> EngineOptionsBuilder {
        EngineOptionsBuilder::default()
    }
}

/// Fluent builder for [`EngineOptions`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptionsBuilder {
    opts: EngineOptions,
}

impl EngineOptionsBuilder {
    #[must_use]
    pub fn show_errors(mut self, show: bool) -> Self {
        self.opts.show_errors = show;
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.opts.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn prepare(mut self, prepare: bool) -> Self {
        self.opts.prepare = prepare;
        self
    }

    #[must_use]
    pub fn trace(mut self, trace: bool) -> Self {
        self.opts.trace = trace;
        self
    }

    #[must_use]
    pub fn convert_mysql_to_mssql(mut self, convert: bool) -> Self {
        self.opts.convert_mysql_to_mssql = convert;
        self
    }

    #[must_use]
    pub fn finish(self) -> EngineOptions {
        self.opts
    }
}
