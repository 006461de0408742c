//! Readiness probes for the database and the message broker.

mod checker;
mod postgres;
mod rabbitmq;

pub use checker::{DependencyCheck, DependencyKind, ReadinessPolicy, ReadinessProbe, ReadinessProber};
pub use postgres::{to_libpq_url, PostgresProbe};
pub use rabbitmq::RabbitMqProbe;
