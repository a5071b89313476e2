//! The capability contract every backend implements.
//!
//! The engine owns one `Box<dyn Adapter>` and drives it; adapters never see
//! the cache, the profiler or the error registry.

use crate::config::ConnectionConfig;
use crate::error::SqlDbalError;
use crate::escape;
use crate::results::Materializer;
use crate::types::{DatabaseType, RowValues};

pub trait Adapter: Send {
    /// Vendor tag used for dialect decisions.
    fn database_type(&self) -> DatabaseType;

    /// Open the native connection, replacing any existing one.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ConfigError` for missing credentials or a driver error when the
    /// server cannot be reached.
    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), SqlDbalError>;

    /// Switch the active database / schema.
    ///
    /// # Errors
    /// Returns `SqlDbalError::SelectionError` or a driver error when the database cannot be used.
    fn select(&mut self, database: &str) -> Result<(), SqlDbalError>;

    fn is_connected(&self) -> bool;

    /// Release the native handle. Safe to call when not connected.
    fn disconnect(&mut self);

    fn escape(&self, text: &str) -> String {
        escape::escape(self.database_type(), text)
    }

    fn sysdate(&self) -> &'static str {
        self.database_type().sysdate()
    }

    /// Run a row-returning statement, pushing columns and rows into `out`.
    ///
    /// # Errors
    /// Returns the driver error when preparation, execution or row decoding fails.
    fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
        out: &mut Materializer,
    ) -> Result<(), SqlDbalError>;

    /// Run a mutating statement and report the affected row count.
    ///
    /// # Errors
    /// Returns the driver error when execution fails.
    fn execute_dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, SqlDbalError>;

    /// Told when a transaction-control statement has opened (`true`) or ended
    /// (`false`) a transaction on this connection.
    fn transaction_changed(&mut self, _active: bool) {}

    /// Id generated by the most recent insert on this connection, if the driver knows one.
    ///
    /// # Errors
    /// Returns the driver error when the lookup itself fails.
    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlDbalError>;
}

pub(crate) fn not_connected(db_type: DatabaseType) -> SqlDbalError {
    SqlDbalError::NotConnected(format!("no open {db_type} connection"))
}
