#![allow(unused_assignments)]

//! # airflow-run
//!
//! Launches a Celery-executor Airflow deployment as Docker containers: a
//! PostgreSQL metadata database, a RabbitMQ broker, the schema-init job,
//! scheduler, workers, web server and Flower.
//!
//! ## Features
//!
//! - **Config Resolution**: connection strings derived from the `postgresql` and
//!   `rabbitmq` sections unless overridden in `environment-overrides`
//! - **Readiness Gating**: every Airflow role waits for its database/broker,
//!   retried with a Fibonacci backoff
//! - **Idempotent Launches**: a role whose container is already running is skipped
//! - **Scale-out Workers**: additional workers get `airflow_worker_N` names and
//!   offset log-server ports
//! - **Cancellation Support**: backoff sleeps and the launch sequence stop on a
//!   `CancellationToken`
//!
//! ## Quick Start
//!
//! ```no_run
//! use airflow_run::{Orchestrator, Parser, RunTarget};
//!
//! # async fn example() -> Result<(), airflow_run::Error> {
//! let parser = Parser::new();
//! let config = parser.load_config(parser.config_path(None))?;
//!
//! let mut orchestrator = Orchestrator::builder().config(config).build().await?;
//! let reports = orchestrator.run(RunTarget::All).await?;
//! for report in reports {
//!     println!("{}: {:?}", report.role, report.outcome);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod docker;
pub mod error;
pub mod healthcheck;
pub mod orchestrator;
pub mod retry;
pub mod service;

// Re-export commonly used types
pub use config::{Config, Parser, ResolvedConfig};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorOptions};
pub use retry::{Retrier, RetryPolicy};
pub use service::{RunTarget, ServiceRole};
