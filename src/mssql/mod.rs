//! SQL Server backend over tiberius, driven by an adapter-owned runtime.

pub mod params;
pub mod query;

use tiberius::{AuthMethod, Client, Config as TiberiusConfig};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::compat::TokioAsyncWriteCompatExt;

use crate::adapters::{Adapter, not_connected};
use crate::config::ConnectionConfig;
use crate::error::SqlDbalError;
use crate::results::Materializer;
use crate::types::{DatabaseType, RowValues};

pub use query::MssqlClient;

const DEFAULT_PORT: u16 = 1433;

/// Errors after which the TDS stream cannot be trusted and must be reopened.
fn connection_lost(err: &SqlDbalError) -> bool {
    matches!(
        err,
        SqlDbalError::Io(_)
            | SqlDbalError::MssqlError(
                tiberius::error::Error::Io { .. }
                    | tiberius::error::Error::Protocol(_)
                    | tiberius::error::Error::Tls(_)
            )
    )
}

pub struct MssqlAdapter {
    runtime: Runtime,
    client: Option<MssqlClient>,
    config: Option<ConnectionConfig>,
}

impl std::fmt::Debug for MssqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlAdapter")
            .field("connected", &self.client.is_some())
            .field("database", &self.config.as_ref().and_then(|c| c.database.clone()))
            .finish_non_exhaustive()
    }
}

impl MssqlAdapter {
    /// # Errors
    /// Returns `SqlDbalError::ConnectionError` if the runtime backing the driver cannot be built.
    pub fn new() -> Result<Self, SqlDbalError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                SqlDbalError::ConnectionError(format!("Failed to build SQL Server runtime: {e}"))
            })?;
        Ok(Self {
            runtime,
            client: None,
            config: None,
        })
    }

    fn driver_config(config: &ConnectionConfig) -> Result<TiberiusConfig, SqlDbalError> {
        config.require_server_credentials()?;
        let mut cfg = TiberiusConfig::new();
        cfg.host(config.host.as_deref().unwrap_or_default());
        cfg.port(config.port.unwrap_or(DEFAULT_PORT));
        cfg.authentication(AuthMethod::sql_server(
            config.user.as_deref().unwrap_or_default(),
            config.password.as_deref().unwrap_or_default(),
        ));
        if let Some(database) = &config.database {
            cfg.database(database);
        }
        cfg.trust_cert();
        Ok(cfg)
    }

    /// Forget the client when `result` shows the connection is gone, so the
    /// engine's reconnect runs on the next statement.
    fn settle<T>(&mut self, result: Result<T, SqlDbalError>) -> Result<T, SqlDbalError> {
        if let Err(e) = &result
            && connection_lost(e)
        {
            tracing::warn!(error = %e, "sql server connection lost");
            self.client = None;
        }
        result
    }

    fn client_mut(&mut self) -> Result<(&Runtime, &mut MssqlClient), SqlDbalError> {
        match self.client.as_mut() {
            Some(client) => Ok((&self.runtime, client)),
            None => Err(not_connected(DatabaseType::Mssql)),
        }
    }
}

impl Adapter for MssqlAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), SqlDbalError> {
        let cfg = Self::driver_config(config)?;
        let client = self.runtime.block_on(async {
            let tcp = TcpStream::connect(cfg.get_addr()).await?;
            tcp.set_nodelay(true)?;
            let client = Client::connect(cfg, tcp.compat_write()).await?;
            Ok::<_, SqlDbalError>(client)
        })?;
        tracing::info!(
            host = config.host.as_deref().unwrap_or_default(),
            database = config.database.as_deref().unwrap_or_default(),
            "connected to sql server"
        );
        self.client = Some(client);
        self.config = Some(config.clone());
        Ok(())
    }

    fn select(&mut self, database: &str) -> Result<(), SqlDbalError> {
        if database.is_empty() || database.contains(']') {
            return Err(SqlDbalError::SelectionError(format!(
                "invalid database name: {database:?}"
            )));
        }
        let (runtime, client) = self.client_mut()?;
        let used = runtime.block_on(query::execute_dml(client, &format!("USE [{database}]"), &[]));
        self.settle(used)?;
        if let Some(config) = self.config.as_mut() {
            config.database = Some(database.to_string());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn disconnect(&mut self) {
        if let Some(client) = self.client.take()
            && let Err(e) = self.runtime.block_on(client.close())
        {
            tracing::warn!(error = %e, "sql server close failed");
        }
    }

    fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
        out: &mut Materializer,
    ) -> Result<(), SqlDbalError> {
        let (runtime, client) = self.client_mut()?;
        let result = runtime.block_on(query::build_result_set(client, query, params, out));
        self.settle(result)
    }

    fn execute_dml(&mut self, query: &str, params: &[RowValues]) -> Result<usize, SqlDbalError> {
        let (runtime, client) = self.client_mut()?;
        let result = runtime.block_on(query::execute_dml(client, query, params));
        self.settle(result)
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, SqlDbalError> {
        let (runtime, client) = self.client_mut()?;
        let result = runtime.block_on(query::last_identity(client));
        self.settle(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bracket_in_database_name() {
        let mut adapter = MssqlAdapter::new().unwrap();
        assert!(matches!(
            adapter.select("bad]name"),
            Err(SqlDbalError::SelectionError(_))
        ));
    }

    #[test]
    fn connect_requires_password() {
        let mut adapter = MssqlAdapter::new().unwrap();
        let err = adapter
            .connect(&ConnectionConfig::new().with_host("db").with_user("sa"))
            .unwrap_err();
        assert!(matches!(err, SqlDbalError::ConfigError(_)));
    }

    #[test]
    fn io_failures_count_as_a_lost_connection() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(connection_lost(&SqlDbalError::from(tiberius::error::Error::from(
            reset
        ))));
        let aborted = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        assert!(connection_lost(&SqlDbalError::Io(aborted)));
        assert!(connection_lost(&SqlDbalError::MssqlError(
            tiberius::error::Error::Protocol("unexpected token".into())
        )));
    }

    #[test]
    fn statement_failures_keep_the_connection() {
        assert!(!connection_lost(&SqlDbalError::MssqlError(
            tiberius::error::Error::Conversion("bad value".into())
        )));
        assert!(!connection_lost(&SqlDbalError::Other("x".into())));
    }

    #[test]
    fn settle_passes_results_through() {
        let mut adapter = MssqlAdapter::new().unwrap();
        assert_eq!(adapter.settle(Ok(3)).unwrap(), 3);
        let lost = adapter.settle::<usize>(Err(SqlDbalError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "eof",
        ))));
        assert!(matches!(lost, Err(SqlDbalError::Io(_))));
        assert!(!adapter.is_connected());
    }
}
