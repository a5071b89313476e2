//! The query engine: connection lifecycle, caching, result buffering and
//! error capture around one [`Adapter`].
//!
//! ```rust,no_run
//! use sql_dbal::prelude::*;
//!
//! # fn demo() -> Result<(), SqlDbalError> {
//! let mut db = Database::sqlite(":memory:", EngineOptions::default())?;
//! db.query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")?;
//! db.query_with_params("INSERT INTO t (name) VALUES (?)", &[RowValues::from("ann")])?;
//! assert_eq!(db.insert_id(), Some(1));
//!
//! let name = db.get_var(Some("SELECT name FROM t"), 0, 0)?;
//! assert_eq!(name, Some(RowValues::Text("ann".into())));
//! # Ok(())
//! # }
//! ```

mod classify;
mod debug;
mod record;

pub use classify::StatementKind;
pub use record::{CallSite, QueryRecord, TraceRecord};

use std::panic::Location;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::adapters::Adapter;
use crate::cache::{CachedValue, QueryCache, fingerprint};
use crate::config::{ConnectionConfig, EngineOptions};
use crate::conversion;
use crate::error::SqlDbalError;
use crate::profiler::Profiler;
use crate::query_builder::{QueryAndParams, QueryBuilder, Where};
use crate::registry::{CapturedError, ErrorRegistry};
use crate::results::{
    ColumnField, ColumnInfo, CustomDbRow, FetchedRow, FetchedRows, Materializer, ResultSet,
};
use crate::schema::SchemaBuilder;
use crate::types::{DatabaseType, OutputFormat, RowValues};

pub struct Database {
    adapter: Box<dyn Adapter>,
    connection: Option<ConnectionConfig>,
    /// Set by the first successful connect and kept across disconnects.
    vendor: Option<DatabaseType>,
    cache: Option<QueryCache>,
    use_cache: bool,
    prepare: bool,
    trace: bool,
    convert_mysql_to_mssql: bool,
    registry: ErrorRegistry,
    profiler: Profiler,
    last_query: Option<QueryRecord>,
    last_result: ResultSet,
    rows_affected: usize,
    insert_id: Option<i64>,
    from_cache: bool,
    num_queries: u64,
    conn_queries: u64,
    trace_log: Vec<TraceRecord>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("vendor", &self.vendor)
            .field("connected", &self.adapter.is_connected())
            .field("cache", &self.cache)
            .field("num_queries", &self.num_queries)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Wrap an adapter. Nothing is connected until [`connect`](Self::connect).
    #[must_use]
    pub fn new(adapter: Box<dyn Adapter>, options: EngineOptions) -> Self {
        let cache = options.cache.as_ref().map(QueryCache::from_config);
        Self {
            adapter,
            connection: None,
            vendor: None,
            use_cache: cache.is_some(),
            cache,
            prepare: options.prepare,
            trace: options.trace,
            convert_mysql_to_mssql: options.convert_mysql_to_mssql,
            registry: ErrorRegistry::new(options.show_errors),
            profiler: Profiler::new(),
            last_query: None,
            last_result: ResultSet::default(),
            rows_affected: 0,
            insert_id: None,
            from_cache: false,
            num_queries: 0,
            conn_queries: 0,
            trace_log: Vec::new(),
        }
    }

    /// Build the adapter for `db_type` and connect it.
    ///
    /// # Errors
    /// Returns `SqlDbalError::Unimplemented` for vendors without a compiled-in
    /// adapter, or the connection error.
    pub fn open(
        db_type: DatabaseType,
        config: ConnectionConfig,
        options: EngineOptions,
    ) -> Result<Self, SqlDbalError> {
        let adapter: Box<dyn Adapter> = match db_type {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Box::new(crate::sqlite::SqliteAdapter::new()),
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Box::new(crate::postgres::PostgresAdapter::new()?),
            #[cfg(feature = "mssql")]
            DatabaseType::Mssql => Box::new(crate::mssql::MssqlAdapter::new()?),
            other => {
                return Err(SqlDbalError::Unimplemented(format!(
                    "no adapter compiled in for {other}"
                )));
            }
        };
        let mut db = Self::new(adapter, options);
        db.connect(config)?;
        Ok(db)
    }

    /// Open a `SQLite` database file (or `:memory:`).
    ///
    /// # Errors
    /// Returns the driver error when the file cannot be opened.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: &str, options: EngineOptions) -> Result<Self, SqlDbalError> {
        Self::open(DatabaseType::Sqlite, ConnectionConfig::sqlite(path), options)
    }

    // ---- connection lifecycle ----

    /// Connect with `config`, which is kept for a later reconnect.
    ///
    /// # Errors
    /// Returns (and registers) the adapter's connection error.
    pub fn connect(&mut self, config: ConnectionConfig) -> Result<(), SqlDbalError> {
        if let Err(e) = self.adapter.connect(&config) {
            return Err(self.registry.capture(e, None));
        }
        self.vendor = Some(self.adapter.database_type());
        self.conn_queries = 0;
        tracing::info!(
            vendor = %self.adapter.database_type(),
            database = config.database.as_deref().unwrap_or_default(),
            "database connected"
        );
        self.connection = Some(config);
        Ok(())
    }

    /// Switch the active database.
    ///
    /// # Errors
    /// Returns (and registers) the adapter's selection error.
    pub fn select(&mut self, database: &str) -> Result<(), SqlDbalError> {
        if let Err(e) = self.adapter.select(database) {
            return Err(self.registry.capture(e, None));
        }
        if let Some(config) = self.connection.as_mut() {
            config.database = Some(database.to_string());
        }
        tracing::info!(database, "database selected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.adapter.disconnect();
        tracing::info!("database disconnected");
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.adapter.is_connected()
    }

    /// Vendor of the adapter once a connection has been made.
    #[must_use]
    pub fn vendor(&self) -> Option<DatabaseType> {
        self.vendor
    }

    #[must_use]
    pub fn escape(&self, text: &str) -> String {
        self.adapter.escape(text)
    }

    #[must_use]
    pub fn sysdate(&self) -> &'static str {
        self.adapter.sysdate()
    }

    /// Clear the result of the previous statement.
    pub fn flush(&mut self) {
        self.last_result = ResultSet::default();
        self.rows_affected = 0;
        self.insert_id = None;
        self.last_query = None;
        self.from_cache = false;
    }

    // ---- toggles ----

    pub fn show_errors(&mut self) {
        self.registry.set_show_errors(true);
    }

    pub fn hide_errors(&mut self) {
        self.registry.set_show_errors(false);
    }

    /// Turn the query cache on or off. Has no effect without a configured cache.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.use_cache = enabled && self.cache.is_some();
    }

    /// Drop every cached entry.
    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }

    /// Whether the builder conveniences bind values as parameters.
    pub fn set_prepare(&mut self, prepare: bool) {
        self.prepare = prepare;
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    // ---- statements ----

    /// Run `sql` and return rows affected (mutations) or rows returned (reads).
    ///
    /// # Errors
    /// Returns (and registers) connection and driver errors.
    #[track_caller]
    pub fn query(&mut self, sql: &str) -> Result<usize, SqlDbalError> {
        self.run("query", Location::caller(), sql, &[])
    }

    /// [`query`](Self::query) with bound parameters in the adapter's placeholder style.
    ///
    /// # Errors
    /// Returns (and registers) connection and driver errors.
    #[track_caller]
    pub fn query_with_params(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlDbalError> {
        self.run("query_with_params", Location::caller(), sql, params)
    }

    /// Run a builder result.
    ///
    /// # Errors
    /// Returns (and registers) connection and driver errors.
    #[track_caller]
    pub fn execute(&mut self, statement: &QueryAndParams) -> Result<usize, SqlDbalError> {
        self.run("execute", Location::caller(), &statement.query, &statement.params)
    }

    /// # Errors
    /// Returns (and registers) connection and driver errors.
    #[track_caller]
    pub fn begin_transaction(&mut self) -> Result<(), SqlDbalError> {
        let sql = self.adapter.database_type().begin_statement();
        self.run("begin_transaction", Location::caller(), sql, &[])
            .map(|_| ())
    }

    /// # Errors
    /// Returns (and registers) connection and driver errors.
    #[track_caller]
    pub fn commit(&mut self) -> Result<(), SqlDbalError> {
        let sql = self.adapter.database_type().commit_statement();
        self.run("commit", Location::caller(), sql, &[]).map(|_| ())
    }

    /// # Errors
    /// Returns (and registers) connection and driver errors.
    #[track_caller]
    pub fn rollback(&mut self) -> Result<(), SqlDbalError> {
        let sql = self.adapter.database_type().rollback_statement();
        self.run("rollback", Location::caller(), sql, &[]).map(|_| ())
    }

    fn run(
        &mut self,
        method: &'static str,
        caller: &'static Location<'static>,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlDbalError> {
        self.flush();
        let normalized = sql.trim();
        let call_site = CallSite::new(method, caller);
        self.last_query = Some(QueryRecord {
            raw: sql.to_string(),
            normalized: normalized.to_string(),
            call_site,
            at: Utc::now(),
        });

        self.num_queries += 1;
        self.conn_queries += 1;
        let query_id = self.num_queries;
        self.profiler.start(query_id);

        let kind = StatementKind::classify(normalized);
        let key = fingerprint(normalized, params);

        if let Some(value) = self.cache_lookup(&key, kind) {
            let count = self.restore(value);
            self.from_cache = true;
            self.finish(query_id, &key, call_site, Ok(count));
            return Ok(count);
        }

        let outcome = self
            .ensure_connected()
            .and_then(|()| self.dispatch(kind, normalized, params));
        let outcome = outcome.map_err(|e| self.registry.capture(e, Some(normalized)));

        match &outcome {
            Ok(count) => {
                self.cache_store(&key, kind);
                self.finish(query_id, &key, call_site, Ok(*count));
            }
            Err(e) => self.finish(query_id, &key, call_site, Err(e.to_string())),
        }
        outcome
    }

    fn dispatch(
        &mut self,
        kind: StatementKind,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlDbalError> {
        let converted = if self.convert_mysql_to_mssql
            && matches!(
                self.adapter.database_type(),
                DatabaseType::Mssql | DatabaseType::Sybase
            ) {
            conversion::mysql_to_mssql(sql)
        } else {
            std::borrow::Cow::Borrowed(sql)
        };
        let sql = converted.as_ref();

        match kind {
            StatementKind::Read => {
                let mut out = Materializer::new();
                self.adapter
                    .execute_select(sql, params, &mut out)
                    .map_err(|e| SqlDbalError::execution(e, sql))?;
                self.last_result = out.finish();
                Ok(self.last_result.len())
            }
            StatementKind::Transaction => {
                let affected = self
                    .adapter
                    .execute_dml(sql, params)
                    .map_err(|e| SqlDbalError::execution(e, sql))?;
                if let Some(active) = classify::transaction_effect(sql) {
                    self.adapter.transaction_changed(active);
                }
                Ok(affected)
            }
            StatementKind::Mutation { returns_id } => {
                let affected = self
                    .adapter
                    .execute_dml(sql, params)
                    .map_err(|e| SqlDbalError::execution(e, sql))?;
                self.rows_affected = affected;
                if returns_id {
                    match self.adapter.last_insert_id() {
                        Ok(id) => self.insert_id = id,
                        // the statement itself succeeded; keep going without an id
                        Err(e) => self.registry.register(e.to_string(), Some(sql)),
                    }
                }
                Ok(affected)
            }
        }
    }

    /// At most one reconnect attempt with the stored config.
    fn ensure_connected(&mut self) -> Result<(), SqlDbalError> {
        if self.adapter.is_connected() {
            return Ok(());
        }
        let Some(config) = self.connection.clone() else {
            return Err(SqlDbalError::NotConnected(
                "no connection has been configured".to_string(),
            ));
        };
        tracing::info!(
            database = config.database.as_deref().unwrap_or_default(),
            "not connected, attempting reconnect"
        );
        self.adapter.connect(&config)?;
        self.vendor = Some(self.adapter.database_type());
        self.conn_queries = 1;
        Ok(())
    }

    fn cache_lookup(&mut self, key: &str, kind: StatementKind) -> Option<CachedValue> {
        if !self.use_cache || kind == StatementKind::Transaction {
            return None;
        }
        let cache = self.cache.as_mut()?;
        if !cache.applies_to(kind.is_mutation()) {
            return None;
        }
        cache.get(key)
    }

    fn cache_store(&mut self, key: &str, kind: StatementKind) {
        if !self.use_cache || kind == StatementKind::Transaction {
            return;
        }
        let value = if kind.is_mutation() {
            CachedValue::Mutation {
                rows_affected: self.rows_affected,
                insert_id: self.insert_id,
            }
        } else {
            CachedValue::from_result_set(&self.last_result)
        };
        if let Some(cache) = self.cache.as_mut() {
            cache.put(key, value, kind.is_mutation());
        }
    }

    fn restore(&mut self, value: CachedValue) -> usize {
        let count = value.return_value();
        match value {
            CachedValue::Mutation {
                rows_affected,
                insert_id,
            } => {
                self.rows_affected = rows_affected;
                self.insert_id = insert_id;
            }
            CachedValue::Read { columns, rows } => {
                let mut result_set = ResultSet::with_capacity(rows.len());
                result_set.set_columns(columns);
                for row in rows {
                    result_set.add_row_values(row);
                }
                self.last_result = result_set;
            }
        }
        count
    }

    fn finish(
        &mut self,
        query_id: u64,
        key: &str,
        call_site: CallSite,
        outcome: Result<usize, String>,
    ) {
        let elapsed = self.profiler.stop(query_id);
        tracing::debug!(
            query_id,
            fingerprint = key,
            cached = self.from_cache,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "query finished"
        );
        if self.trace {
            let (rows, error) = match outcome {
                Ok(rows) => (rows, None),
                Err(e) => (0, Some(e)),
            };
            self.trace_log.push(TraceRecord {
                query: self
                    .last_query
                    .as_ref()
                    .map(|q| q.normalized.clone())
                    .unwrap_or_default(),
                call_site,
                elapsed,
                rows,
                cached: self.from_cache,
                error,
                at: Utc::now(),
            });
        }
    }

    // ---- result accessors ----

    /// Rows of `query` (run first when given) or of the last statement.
    ///
    /// # Errors
    /// Returns the error of `query` when it fails.
    #[track_caller]
    pub fn get_results(
        &mut self,
        query: Option<&str>,
        format: OutputFormat,
    ) -> Result<FetchedRows, SqlDbalError> {
        if let Some(sql) = query {
            self.run("get_results", Location::caller(), sql, &[])?;
        }
        let rows = &self.last_result.results;
        Ok(match format {
            OutputFormat::Object => FetchedRows::Object(rows.clone()),
            OutputFormat::Numeric => FetchedRows::Numeric(self.last_result.to_value_rows()),
            OutputFormat::Json => {
                FetchedRows::Json(JsonValue::Array(rows.iter().map(CustomDbRow::to_json).collect()))
            }
        })
    }

    /// Row `row_offset` of `query` or of the last result, `None` past the end.
    ///
    /// # Errors
    /// Returns the error of `query` when it fails.
    #[track_caller]
    pub fn get_row(
        &mut self,
        query: Option<&str>,
        row_offset: usize,
        format: OutputFormat,
    ) -> Result<Option<FetchedRow>, SqlDbalError> {
        if let Some(sql) = query {
            self.run("get_row", Location::caller(), sql, &[])?;
        }
        let Some(row) = self.last_result.results.get(row_offset) else {
            return Ok(None);
        };
        Ok(Some(match format {
            OutputFormat::Object => FetchedRow::Object(row.clone()),
            OutputFormat::Numeric => FetchedRow::Numeric(row.rows.clone()),
            OutputFormat::Json => FetchedRow::Json(row.to_json()),
        }))
    }

    /// Single value at column `x`, row `y`.
    ///
    /// # Errors
    /// Returns the error of `query` when it fails.
    #[track_caller]
    pub fn get_var(
        &mut self,
        query: Option<&str>,
        x: usize,
        y: usize,
    ) -> Result<Option<RowValues>, SqlDbalError> {
        if let Some(sql) = query {
            self.run("get_var", Location::caller(), sql, &[])?;
        }
        Ok(self
            .last_result
            .results
            .get(y)
            .and_then(|row| row.get_by_index(x))
            .cloned())
    }

    /// Every value of column `x`.
    ///
    /// # Errors
    /// Returns the error of `query` when it fails.
    #[track_caller]
    pub fn get_col(&mut self, query: Option<&str>, x: usize) -> Result<Vec<RowValues>, SqlDbalError> {
        if let Some(sql) = query {
            self.run("get_col", Location::caller(), sql, &[])?;
        }
        Ok(self
            .last_result
            .results
            .iter()
            .filter_map(|row| row.get_by_index(x).cloned())
            .collect())
    }

    /// One metadata field of every column, or of column `offset` only.
    #[must_use]
    pub fn get_col_info(&self, field: ColumnField, offset: Option<usize>) -> Vec<Option<String>> {
        let columns = self.last_result.columns();
        match offset {
            Some(i) => columns.get(i).map(|c| field.read(c)).into_iter().collect(),
            None => columns.iter().map(|c| field.read(c)).collect(),
        }
    }

    #[must_use]
    pub fn last_query(&self) -> Option<&QueryRecord> {
        self.last_query.as_ref()
    }

    #[must_use]
    pub fn last_result(&self) -> &ResultSet {
        &self.last_result
    }

    #[must_use]
    pub fn column_info(&self) -> &[ColumnInfo] {
        self.last_result.columns()
    }

    #[must_use]
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    #[must_use]
    pub fn insert_id(&self) -> Option<i64> {
        self.insert_id
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.last_result.len()
    }

    #[must_use]
    pub fn num_queries(&self) -> u64 {
        self.num_queries
    }

    #[must_use]
    pub fn conn_queries(&self) -> u64 {
        self.conn_queries
    }

    /// Whether the last statement was answered from the cache.
    #[must_use]
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    #[must_use]
    pub fn total_query_time(&self) -> Duration {
        self.profiler.total()
    }

    #[must_use]
    pub fn last_query_time(&self) -> Duration {
        self.profiler.last_elapsed()
    }

    #[must_use]
    pub fn trace_log(&self) -> &[TraceRecord] {
        &self.trace_log
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.registry.last_error()
    }

    #[must_use]
    pub fn captured_errors(&self) -> &[CapturedError] {
        self.registry.captured()
    }

    // ---- builders ----

    fn active_vendor(&mut self) -> Result<DatabaseType, SqlDbalError> {
        self.vendor.ok_or_else(|| {
            self.registry.capture(
                SqlDbalError::NotConnected("no vendor until the first connect".to_string()),
                None,
            )
        })
    }

    /// Schema builder fixed to the connected vendor.
    ///
    /// # Errors
    /// Returns `SqlDbalError::NotConnected` if no connection was ever made.
    pub fn schema(&mut self) -> Result<SchemaBuilder, SqlDbalError> {
        self.active_vendor().map(SchemaBuilder::new)
    }

    /// Query builder fixed to the connected vendor and the prepare toggle.
    ///
    /// # Errors
    /// Returns `SqlDbalError::NotConnected` if no connection was ever made.
    pub fn builder(&mut self) -> Result<QueryBuilder, SqlDbalError> {
        let prepare = self.prepare;
        self.active_vendor().map(|db| QueryBuilder::new(db, prepare))
    }

    /// `SELECT columns FROM table [WHERE filter]`.
    ///
    /// # Errors
    /// Returns (and registers) builder, connection and driver errors.
    #[track_caller]
    pub fn selecting(
        &mut self,
        table: &str,
        columns: &[&str],
        filter: Option<Where>,
    ) -> Result<usize, SqlDbalError> {
        let caller = Location::caller();
        let builder = self.builder()?;
        let mut select = builder.select(table, columns);
        if let Some(filter) = filter {
            select = select.filter(filter);
        }
        let statement = select.build();
        self.run_built("selecting", caller, statement)
    }

    /// # Errors
    /// Returns (and registers) builder, connection and driver errors.
    #[track_caller]
    pub fn insert<K, V>(
        &mut self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<usize, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        let caller = Location::caller();
        let statement = self.builder()?.insert(table, values);
        self.run_built("insert", caller, statement)
    }

    /// # Errors
    /// Returns (and registers) builder, connection and driver errors.
    #[track_caller]
    pub fn replace<K, V>(
        &mut self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<usize, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        let caller = Location::caller();
        let statement = self.builder()?.replace(table, values);
        self.run_built("replace", caller, statement)
    }

    /// # Errors
    /// Returns (and registers) builder, connection and driver errors.
    #[track_caller]
    pub fn update<K, V>(
        &mut self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
        filter: Option<&Where>,
    ) -> Result<usize, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        let caller = Location::caller();
        let statement = self.builder()?.update(table, values, filter);
        self.run_built("update", caller, statement)
    }

    /// # Errors
    /// Returns (and registers) builder, connection and driver errors.
    #[track_caller]
    pub fn delete(&mut self, table: &str, filter: Option<&Where>) -> Result<usize, SqlDbalError> {
        let caller = Location::caller();
        let statement = self.builder()?.delete(table, filter);
        self.run_built("delete", caller, statement)
    }

    fn run_built(
        &mut self,
        method: &'static str,
        caller: &'static Location<'static>,
        statement: Result<QueryAndParams, SqlDbalError>,
    ) -> Result<usize, SqlDbalError> {
        match statement {
            Ok(q) => self.run(method, caller, &q.query, &q.params),
            Err(e) => Err(self.registry.capture(e, None)),
        }
    }
}
