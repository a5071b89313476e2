use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as query parameters.
///
/// Every adapter converts its driver-native scalars into this enum, so nothing
/// backend-specific ever reaches a [`ResultSet`](crate::results::ResultSet):
/// ```rust
/// use sql_dbal::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Short lowercase name of the variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "int",
            RowValues::Float(_) => "float",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "bool",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::Null => "null",
            RowValues::JSON(_) => "json",
            RowValues::Blob(_) => "blob",
        }
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// JSON view of the value, used by [`OutputFormat::Json`].
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::from(s.as_str()),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Timestamp(dt) => JsonValue::from(dt.format("%F %T%.f").to_string()),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(v) => v.clone(),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => f.write_str(s),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(dt) => write!(f, "{}", dt.format("%F %T%.f")),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

/// The database vendor a connection or builder targets.
///
/// Builders take the vendor explicitly; the engine hands out builders fixed to
/// the vendor of its adapter once a connection has been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum DatabaseType {
    /// `MySQL` / `MariaDB`
    Mysql,
    /// `PostgreSQL` database
    Postgres,
    /// `SQLite` database
    Sqlite,
    /// SQL Server database
    Mssql,
    /// Oracle database
    Oracle,
    /// Sybase ASE
    Sybase,
}

/// How bound parameters are spelled in SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Positional `?`
    Question,
    /// PostgreSQL-style `$1`
    Dollar,
    /// SQL Server-style `@P1`
    AtP,
    /// Oracle-style `:1`
    Colon,
}

impl PlaceholderStyle {
    /// Render the placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn render(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${index}"),
            PlaceholderStyle::AtP => format!("@P{index}"),
            PlaceholderStyle::Colon => format!(":{index}"),
        }
    }
}

impl DatabaseType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DatabaseType::Mysql => "mysql",
            DatabaseType::Postgres => "pgsql",
            DatabaseType::Sqlite => "sqlite3",
            DatabaseType::Mssql => "sqlsrv",
            DatabaseType::Oracle => "oracle",
            DatabaseType::Sybase => "sybase",
        }
    }

    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            DatabaseType::Mysql | DatabaseType::Sqlite => PlaceholderStyle::Question,
            DatabaseType::Postgres => PlaceholderStyle::Dollar,
            DatabaseType::Mssql | DatabaseType::Sybase => PlaceholderStyle::AtP,
            DatabaseType::Oracle => PlaceholderStyle::Colon,
        }
    }

    /// SQL fragment for the server's current date and time.
    #[must_use]
    pub fn sysdate(self) -> &'static str {
        match self {
            DatabaseType::Mysql | DatabaseType::Postgres => "NOW()",
            DatabaseType::Sqlite => "CURRENT_TIMESTAMP",
            DatabaseType::Mssql | DatabaseType::Sybase => "GETDATE()",
            DatabaseType::Oracle => "SYSDATE",
        }
    }

    #[must_use]
    pub fn begin_statement(self) -> &'static str {
        match self {
            DatabaseType::Mysql => "START TRANSACTION",
            DatabaseType::Mssql | DatabaseType::Sybase => "BEGIN TRANSACTION",
            DatabaseType::Oracle => "SET TRANSACTION READ WRITE",
            DatabaseType::Postgres | DatabaseType::Sqlite => "BEGIN",
        }
    }

    #[must_use]
    pub fn commit_statement(self) -> &'static str {
        match self {
            DatabaseType::Mssql | DatabaseType::Sybase => "COMMIT TRANSACTION",
            _ => "COMMIT",
        }
    }

    #[must_use]
    pub fn rollback_statement(self) -> &'static str {
        match self {
            DatabaseType::Mssql | DatabaseType::Sybase => "ROLLBACK TRANSACTION",
            _ => "ROLLBACK",
        }
    }

    /// Whether this vendor escapes with backslashes rather than doubled quotes only.
    #[must_use]
    pub fn uses_backslash_escapes(self) -> bool {
        matches!(self, DatabaseType::Mysql)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of the rows handed back by the `get_*` accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Rows addressable by column name.
    #[default]
    Object,
    /// Rows as plain value vectors in column order.
    Numeric,
    /// Rows as JSON objects keyed by column name.
    Json,
}
