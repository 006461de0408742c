use super::{DependencyKind, ReadinessProbe};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_postgres::NoTls;

/// Tables query used to prove the connection is usable, not merely accepted.
const LIST_TABLES: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'";

/// Connects to the metadata database and lists its tables.
#[derive(Debug, Clone)]
pub struct PostgresProbe {
    connection_string: String,
    connect_timeout: Duration,
}

impl PostgresProbe {
    /// `connection_string` may carry a SQLAlchemy driver suffix
    /// (`postgresql+psycopg2://`); it is dropped before connecting.
    pub fn new(connection_string: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            connection_string: connection_string.into(),
            connect_timeout,
        }
    }

    fn probe_error(&self, message: impl Into<String>) -> Error {
        Error::Probe {
            check: self.kind().to_string(),
            message: message.into(),
        }
    }
}

/// Turn a SQLAlchemy URL into one libpq understands.
pub fn to_libpq_url(connection_string: &str) -> String {
    match connection_string.split_once("://") {
        Some((scheme, rest)) => {
            let base = scheme.split('+').next().unwrap_or(scheme);
            format!("{}://{}", base, rest)
        }
        None => connection_string.to_string(),
    }
}

#[async_trait]
impl ReadinessProbe for PostgresProbe {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Database
    }

    async fn check(&self) -> Result<bool> {
        let url = to_libpq_url(&self.connection_string);
        let mut config: tokio_postgres::Config = url
            .parse()
            .map_err(|e| self.probe_error(format!("invalid connection string: {}", e)))?;
        config.connect_timeout(self.connect_timeout);

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| self.probe_error(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!("Postgresql connection closed with error: {}", e);
            }
        });

        let rows = client
            .query(LIST_TABLES, &[])
            .await
            .map_err(|e| self.probe_error(e.to_string()))?;
        tracing::debug!("Postgresql lists {} tables", rows.len());

        Ok(true)
    }

    fn timeout(&self) -> Duration {
        // The connect timeout bounds the handshake; leave room for the query.
        self.connect_timeout.saturating_add(Duration::from_secs(5))
    }
}
