//! Helpers for exercising the engine without a database server.
//!
//! [`ScriptedAdapter`] answers statements from a queue of canned responses and
//! counts what the engine asked of it. The [`ScriptHandle`] stays with the test
//! after the adapter has been boxed into a [`Database`](crate::Database).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapters::Adapter;
use crate::config::ConnectionConfig;
use crate::error::SqlDbalError;
use crate::results::{ColumnInfo, CustomDbRow, Materializer};
use crate::types::{DatabaseType, RowValues};

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<RowValues>>,
    },
    Affected(usize),
    Error(String),
}

#[derive(Debug, Default)]
struct Shared {
    connected: AtomicBool,
    in_transaction: AtomicBool,
    fail_connect: AtomicBool,
    connects: AtomicUsize,
    executes: AtomicUsize,
    responses: Mutex<VecDeque<Scripted>>,
    statements: Mutex<Vec<String>>,
    last_insert_id: Mutex<Option<i64>>,
}

/// Test-side view of a [`ScriptedAdapter`].
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    shared: Arc<Shared>,
}

impl ScriptHandle {
    fn push(&self, response: Scripted) {
        self.shared
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<RowValues>>) {
        self.push(Scripted::Rows {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows,
        });
    }

    pub fn push_affected(&self, rows: usize) {
        self.push(Scripted::Affected(rows));
    }

    pub fn push_error(&self, message: &str) {
        self.push(Scripted::Error(message.to_string()));
    }

    pub fn set_last_insert_id(&self, id: Option<i64>) {
        *self
            .shared
            .last_insert_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = id;
    }

    /// Make every following connect attempt fail.
    pub fn fail_connects(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Simulate the server dropping the connection.
    pub fn sever(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Transaction state as last reported by the engine.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.shared.in_transaction.load(Ordering::SeqCst)
    }

    /// Statements that reached the adapter.
    #[must_use]
    pub fn executes(&self) -> usize {
        self.shared.executes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.shared
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug)]
pub struct ScriptedAdapter {
    db_type: DatabaseType,
    handle: ScriptHandle,
}

impl ScriptedAdapter {
    #[must_use]
    pub fn new(db_type: DatabaseType) -> (Self, ScriptHandle) {
        let handle = ScriptHandle::default();
        (
            Self {
                db_type,
                handle: handle.clone(),
            },
            handle,
        )
    }

    fn next(&self, sql: &str) -> Result<Option<Scripted>, SqlDbalError> {
        let shared = &self.handle.shared;
        if !shared.connected.load(Ordering::SeqCst) {
            return Err(crate::adapters::not_connected(self.db_type));
        }
        shared.executes.fetch_add(1, Ordering::SeqCst);
        shared
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
        Ok(shared
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front())
    }
}

impl Adapter for ScriptedAdapter {
    fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    fn connect(&mut self, _config: &ConnectionConfig) -> Result<(), SqlDbalError> {
        let shared = &self.handle.shared;
        shared.connects.fetch_add(1, Ordering::SeqCst);
        if shared.fail_connect.load(Ordering::SeqCst) {
            return Err(SqlDbalError::ConnectionError(
                "scripted connect failure".to_string(),
            ));
        }
        shared.connected.store(true, Ordering::SeqCst);
        shared.in_transaction.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn select(&mut self, database: &str) -> Result<(), SqlDbalError> {
        if database.is_empty() {
            return Err(SqlDbalError::SelectionError("empty name".to_string()));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.shared.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&mut self) {
        self.handle.sever();
    }

    fn execute_select(
        &mut self,
        query: &str,
        _params: &[RowValues],
        out: &mut Materializer,
    ) -> Result<(), SqlDbalError> {
        match self.next(query)? {
            Some(Scripted::Rows { columns, rows }) => {
                out.set_columns(columns.into_iter().map(ColumnInfo::named).collect());
                for row in rows {
                    out.push_row(row)?;
                }
                Ok(())
            }
            Some(Scripted::Error(message)) => Err(SqlDbalError::Other(message)),
            Some(Scripted::Affected(_)) | None => Ok(()),
        }
    }

    fn execute_dml(&mut self, query: &str, _params: &[RowValues]) -> Result<usize, SqlDbalError> {
        match self.next(query)? {
            Some(Scripted::Affected(n)) => Ok(n),
            Some(Scripted::Error(message)) => Err(SqlDbalError::Other(message)),
            Some(Scripted::Rows { .. }) | None => Ok(0),
        }
    }

    fn transaction_changed(&mut self, active: bool) {
        self.handle.shared.in_transaction.store(active, Ordering::SeqCst);
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlDbalError> {
        Ok(*self
            .handle
            .shared
            .last_insert_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }
}
