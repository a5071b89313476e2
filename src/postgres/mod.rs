//! `PostgreSQL` backend over tokio-postgres.
//!
//! The driver is async; the adapter owns a current-thread runtime and blocks
//! on it for every call. The connection future is spawned onto that runtime
//! and makes progress whenever the adapter is blocked on a client call.

pub mod params;
pub mod query;

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

use crate::adapters::{Adapter, not_connected};
use crate::config::ConnectionConfig;
use crate::error::SqlDbalError;
use crate::results::Materializer;
use crate::types::{DatabaseType, RowValues};

const DEFAULT_PORT: u16 = 5432;
const LASTVAL_SAVEPOINT: &str = "sql_dbal_lastval";

/// Statement that settles the lookup savepoint once `lastval()` has run.
fn savepoint_cleanup(lookup_failed: bool) -> String {
    if lookup_failed {
        format!("ROLLBACK TO SAVEPOINT {LASTVAL_SAVEPOINT}; RELEASE SAVEPOINT {LASTVAL_SAVEPOINT}")
    } else {
        format!("RELEASE SAVEPOINT {LASTVAL_SAVEPOINT}")
    }
}

pub struct PostgresAdapter {
    runtime: Runtime,
    client: Option<Client>,
    config: Option<ConnectionConfig>,
    in_transaction: bool,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("connected", &self.is_connected())
            .field("database", &self.config.as_ref().and_then(|c| c.database.clone()))
            .finish_non_exhaustive()
    }
}

impl PostgresAdapter {
    /// # Errors
    /// Returns `SqlDbalError::ConnectionError` if the runtime backing the driver cannot be built.
    pub fn new() -> Result<Self, SqlDbalError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                SqlDbalError::ConnectionError(format!("Failed to build Postgres runtime: {e}"))
            })?;
        Ok(Self {
            runtime,
            client: None,
            config: None,
            in_transaction: false,
        })
    }

    fn driver_config(config: &ConnectionConfig) -> Result<tokio_postgres::Config, SqlDbalError> {
        config.require_server_credentials()?;
        let dbname = ConnectionConfig::require("dbname", config.database.as_ref())?;

        let mut pg = tokio_postgres::Config::new();
        pg.host(config.host.as_deref().unwrap_or_default())
            .port(config.port.unwrap_or(DEFAULT_PORT))
            .user(config.user.as_deref().unwrap_or_default())
            .password(config.password.as_deref().unwrap_or_default())
            .dbname(dbname);
        if let Some(charset) = &config.charset {
            pg.options(&format!("-c client_encoding={charset}"));
        }
        Ok(pg)
    }

    fn client(&self) -> Result<&Client, SqlDbalError> {
        self.client
            .as_ref()
            .ok_or_else(|| not_connected(DatabaseType::Postgres))
    }
}

impl Adapter for PostgresAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), SqlDbalError> {
        let pg = Self::driver_config(config)?;
        let (client, connection) = self.runtime.block_on(pg.connect(NoTls))?;
        self.runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection closed with error");
            }
        });
        tracing::info!(
            host = config.host.as_deref().unwrap_or_default(),
            database = config.database.as_deref().unwrap_or_default(),
            "connected to postgres"
        );
        self.client = Some(client);
        self.config = Some(config.clone());
        self.in_transaction = false;
        Ok(())
    }

    fn select(&mut self, database: &str) -> Result<(), SqlDbalError> {
        if database.is_empty() {
            return Err(SqlDbalError::SelectionError(
                "database name is required".to_string(),
            ));
        }
        // a postgres session is bound to one database: reconnect
        let config = self
            .config
            .clone()
            .ok_or_else(|| not_connected(DatabaseType::Postgres))?
            .with_database(database);
        self.disconnect();
        self.connect(&config)
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    fn disconnect(&mut self) {
        // dropping the client ends the spawned connection task
        self.client = None;
    }

    fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
        out: &mut Materializer,
    ) -> Result<(), SqlDbalError> {
        let client = self.client()?;
        let refs = params::as_refs(params);
        let (stmt, rows) = self.runtime.block_on(async {
            let stmt = client.prepare(query).await?;
            let rows = client.query(&stmt, &refs).await?;
            Ok::<_, tokio_postgres::Error>((stmt, rows))
        })?;
        query::build_result_set(&stmt, &rows, out)
    }

    fn execute_dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, SqlDbalError> {
        let client = self.client()?;
        let refs = params::as_refs(params);
        let rows = self.runtime.block_on(client.execute(query, &refs))?;
        usize::try_from(rows).map_err(|e| {
            SqlDbalError::Other(format!("Invalid rows affected count: {e}"))
        })
    }

    fn transaction_changed(&mut self, active: bool) {
        self.in_transaction = active;
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlDbalError> {
        let in_transaction = self.in_transaction;
        let client = self.client()?;
        // a failed lastval() would abort an open transaction, so fence it
        let id = self.runtime.block_on(async {
            if in_transaction {
                client
                    .batch_execute(&format!("SAVEPOINT {LASTVAL_SAVEPOINT}"))
                    .await?;
            }
            let lookup = client.query_one("SELECT lastval()", &[]).await;
            if in_transaction {
                client
                    .batch_execute(&savepoint_cleanup(lookup.is_err()))
                    .await?;
            }
            let id: Result<Option<i64>, tokio_postgres::Error> = match lookup {
                Ok(row) => row.try_get::<_, i64>(0).map(Some),
                // 55000: no sequence used yet in this session
                Err(e) if e.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) => {
                    Ok(None)
                }
                Err(e) => Err(e),
            };
            id
        })?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_validates_credentials_before_dialing() {
        let mut adapter = PostgresAdapter::new().unwrap();
        let err = adapter
            .connect(&ConnectionConfig::new().with_host("localhost").with_user("u"))
            .unwrap_err();
        assert!(matches!(err, SqlDbalError::ConfigError(_)));
        assert!(!adapter.is_connected());
    }

    #[test]
    fn select_without_connection_fails() {
        let mut adapter = PostgresAdapter::new().unwrap();
        assert!(matches!(
            adapter.select("other"),
            Err(SqlDbalError::NotConnected(_))
        ));
    }

    #[test]
    fn lookup_savepoint_is_released_or_rolled_back() {
        assert_eq!(savepoint_cleanup(false), "RELEASE SAVEPOINT sql_dbal_lastval");
        assert_eq!(
            savepoint_cleanup(true),
            "ROLLBACK TO SAVEPOINT sql_dbal_lastval; RELEASE SAVEPOINT sql_dbal_lastval"
        );
    }

    #[test]
    fn transaction_state_follows_the_engine() {
        let mut adapter = PostgresAdapter::new().unwrap();
        adapter.transaction_changed(true);
        assert!(adapter.in_transaction);
        adapter.transaction_changed(false);
        assert!(!adapter.in_transaction);
    }
}
