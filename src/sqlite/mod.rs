//! `SQLite` backend over rusqlite.

pub mod params;
pub mod query;

use rusqlite::{Connection, params_from_iter};

use crate::adapters::{Adapter, not_connected};
use crate::config::ConnectionConfig;
use crate::error::SqlDbalError;
use crate::results::Materializer;
use crate::types::{DatabaseType, RowValues};

use params::Params;
use query::build_result_set;

/// Adapter for a `SQLite` file or in-memory database.
///
/// The "database" of the connection config is the file path; `select` reopens
/// the connection on another file.
#[derive(Debug, Default)]
pub struct SqliteAdapter {
    conn: Option<Connection>,
    path: Option<String>,
}

impl SqliteAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the open database, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn open(&mut self, path: &str) -> Result<(), SqlDbalError> {
        let conn = Connection::open(path)?;
        tracing::info!(path, "opened sqlite database");
        self.conn = Some(conn);
        self.path = Some(path.to_string());
        Ok(())
    }

    fn conn_mut(&mut self) -> Result<&mut Connection, SqlDbalError> {
        self.conn
            .as_mut()
            .ok_or_else(|| not_connected(DatabaseType::Sqlite))
    }
}

impl Adapter for SqliteAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), SqlDbalError> {
        let path = ConnectionConfig::require("database", config.database.as_ref())?;
        self.open(path)
    }

    fn select(&mut self, database: &str) -> Result<(), SqlDbalError> {
        if database.is_empty() {
            return Err(SqlDbalError::SelectionError(
                "database path is required".to_string(),
            ));
        }
        self.disconnect();
        self.open(database)
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(error = %e, "sqlite close failed");
            }
        }
    }

    fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
        out: &mut Materializer,
    ) -> Result<(), SqlDbalError> {
        let converted = Params::convert(params);
        let conn = self.conn_mut()?;
        let mut stmt = conn.prepare(query)?;
        build_result_set(&mut stmt, converted.as_values(), out)
    }

    fn execute_dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, SqlDbalError> {
        let converted = Params::convert(params);
        let conn = self.conn_mut()?;
        let before = conn.total_changes();
        if converted.as_values().is_empty() && query.contains(';') {
            conn.execute_batch(query)?;
        } else {
            conn.execute(query, params_from_iter(converted.as_values().iter()))?;
        }
        // DDL leaves sqlite3_changes() at the previous statement's count
        if conn.total_changes() == before {
            return Ok(0);
        }
        // scripts report the change count of their last statement
        usize::try_from(conn.changes())
            .map_err(|e| SqlDbalError::Other(format!("Invalid rows affected count: {e}")))
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlDbalError> {
        Ok(Some(self.conn_mut()?.last_insert_rowid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> SqliteAdapter {
        let mut adapter = SqliteAdapter::new();
        adapter
            .connect(&ConnectionConfig::sqlite(":memory:"))
            .unwrap();
        adapter
    }

    #[test]
    fn connect_requires_a_path() {
        let mut adapter = SqliteAdapter::new();
        let err = adapter.connect(&ConnectionConfig::new()).unwrap_err();
        assert!(matches!(err, SqlDbalError::ConfigError(_)));
        assert!(!adapter.is_connected());
    }

    #[test]
    fn dml_and_select_round_trip() {
        let mut adapter = memory();
        adapter
            .execute_dml("CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR(20))", &[])
            .unwrap();
        let n = adapter
            .execute_dml(
                "INSERT INTO t (name) VALUES (?1)",
                &[RowValues::Text("a".into())],
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(adapter.last_insert_id().unwrap(), Some(1));

        let mut out = Materializer::new();
        adapter
            .execute_select("SELECT id, name FROM t", &[], &mut out)
            .unwrap();
        let rs = out.finish();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.columns()[1].declared_type.as_deref(), Some("VARCHAR(20)"));
        assert_eq!(rs.columns()[1].max_length, Some(20));
    }

    #[test]
    fn queries_after_disconnect_fail() {
        let mut adapter = memory();
        adapter.disconnect();
        assert!(!adapter.is_connected());
        let err = adapter.execute_dml("SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, SqlDbalError::NotConnected(_)));
    }

    #[test]
    fn ddl_reports_no_changes() {
        let mut adapter = memory();
        adapter.execute_dml("CREATE TABLE t (a INT)", &[]).unwrap();
        assert_eq!(adapter.execute_dml("INSERT INTO t VALUES (1), (2), (3)", &[]).unwrap(), 3);
        assert_eq!(adapter.execute_dml("CREATE TABLE u (a INT)", &[]).unwrap(), 0);
        assert_eq!(adapter.execute_dml("DROP TABLE u", &[]).unwrap(), 0);
        assert_eq!(
            adapter
                .execute_dml("CREATE TABLE v (a INT); INSERT INTO v VALUES (1), (2);", &[])
                .unwrap(),
            2
        );
        assert_eq!(adapter.execute_dml("ALTER TABLE v ADD COLUMN b INT", &[]).unwrap(), 0);
    }
}
