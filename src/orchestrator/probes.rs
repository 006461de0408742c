use crate::config::{Config, ResolvedConfig, SQL_ALCHEMY_CONN_KEY};
use crate::error::{Error, Result};
use crate::healthcheck::{DependencyKind, PostgresProbe, RabbitMqProbe, ReadinessProbe};
use std::sync::Arc;
use std::time::Duration;

/// Creates the readiness probe for a dependency.
pub trait ProbeFactory: Send + Sync {
    fn probe(
        &self,
        kind: DependencyKind,
        config: &Config,
        resolved: &ResolvedConfig,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn ReadinessProbe>>;
}

/// Real network probes: Postgres over the resolved connection string,
/// RabbitMQ over AMQP with the broker section's credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkProbes;

impl ProbeFactory for NetworkProbes {
    fn probe(
        &self,
        kind: DependencyKind,
        config: &Config,
        resolved: &ResolvedConfig,
        connect_timeout: Duration,
    ) -> Result<Arc<dyn ReadinessProbe>> {
        match kind {
            DependencyKind::Database => {
                let url = resolved
                    .database_url()
                    .ok_or_else(|| Error::MissingKey(SQL_ALCHEMY_CONN_KEY.to_string()))?;
                Ok(Arc::new(PostgresProbe::new(url, connect_timeout)))
            }
            DependencyKind::Broker => Ok(Arc::new(RabbitMqProbe::from_config(
                &config.rabbitmq,
                connect_timeout,
            ))),
        }
    }
}
