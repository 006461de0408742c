use super::{DependencyKind, ReadinessProbe};
use crate::config::BrokerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{Connection, ConnectionProperties};
use std::time::Duration;

/// Opens an AMQP connection to the broker and closes it again.
#[derive(Debug, Clone)]
pub struct RabbitMqProbe {
    host: String,
    port: u16,
    virtual_host: String,
    username: String,
    password: String,
    connect_timeout: Duration,
}

impl RabbitMqProbe {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        virtual_host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            virtual_host: virtual_host.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout,
        }
    }

    pub fn from_config(broker: &BrokerConfig, connect_timeout: Duration) -> Self {
        Self::new(
            &broker.host,
            broker.port,
            &broker.virtual_host,
            &broker.username,
            &broker.password,
            connect_timeout,
        )
    }

    /// Structured URI; credentials and vhost are passed as-is, never re-parsed.
    pub fn uri(&self) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.username.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.virtual_host.clone(),
            ..Default::default()
        }
    }

    fn probe_error(&self, message: impl Into<String>) -> Error {
        Error::Probe {
            check: self.kind().to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ReadinessProbe for RabbitMqProbe {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Broker
    }

    async fn check(&self) -> Result<bool> {
        let connect = Connection::connect_uri(self.uri(), ConnectionProperties::default());
        let connection = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                self.probe_error(format!(
                    "connection to {}:{} timed out",
                    self.host, self.port
                ))
            })?
            .map_err(|e| self.probe_error(e.to_string()))?;

        let open = connection.status().connected();
        if let Err(e) = connection.close(200, "OK").await {
            tracing::debug!("Rabbitmq connection close failed: {}", e);
        }

        if open {
            Ok(true)
        } else {
            Err(self.probe_error("Fail to connect to Rabbitmq."))
        }
    }

    fn timeout(&self) -> Duration {
        self.connect_timeout.saturating_add(Duration::from_secs(5))
    }
}
