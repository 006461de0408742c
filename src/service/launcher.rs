use super::{merge_mounts, Identity, LaunchSpec, PortBinding, ServiceRole, VolumeMount};
use crate::config::{Config, ResolvedConfig};
use crate::docker::{ContainerHandle, ContainerRuntime};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Default Celery queue a worker consumes.
pub const DEFAULT_QUEUE: &str = "default";

/// Default worker log-server port inside the container.
pub const DEFAULT_WORKER_LOG_SERVER_PORT: u16 = 8793;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    pub queue: String,
    pub log_server_port: u16,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            log_server_port: DEFAULT_WORKER_LOG_SERVER_PORT,
        }
    }
}

/// Turns a role and its identity into a [`LaunchSpec`] and hands it to the runtime.
#[derive(Clone)]
pub struct ServiceLauncher {
    runtime: Arc<dyn ContainerRuntime>,
    worker: WorkerOptions,
}

impl ServiceLauncher {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, worker: WorkerOptions) -> Self {
        Self { runtime, worker }
    }

    pub fn build_spec(
        &self,
        role: ServiceRole,
        config: &Config,
        resolved: &ResolvedConfig,
        identity: &Identity,
    ) -> LaunchSpec {
        match role {
            ServiceRole::Database => {
                let db = &config.postgresql;
                LaunchSpec::builder(db.image_ref(), &identity.name)
                    .envs(db.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .volumes(vec![VolumeMount::new(
                        format!("{}/postgresql", config.local_dir),
                        &db.data,
                    )])
                    .port(PortBinding::same(db.port))
                    .build()
            }
            ServiceRole::Broker => {
                let mq = &config.rabbitmq;
                LaunchSpec::builder(mq.image_ref(), &identity.name)
                    .envs(mq.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .volumes(vec![VolumeMount::new(
                        format!("{}/rabbitmq", config.local_dir),
                        &mq.home,
                    )])
                    .port(PortBinding::same(mq.ui_port))
                    .port(PortBinding::same(mq.port))
                    .build()
            }
            _ => self.airflow_spec(role, config, resolved, identity),
        }
    }

    fn airflow_spec(
        &self,
        role: ServiceRole,
        config: &Config,
        resolved: &ResolvedConfig,
        identity: &Identity,
    ) -> LaunchSpec {
        let builder = LaunchSpec::builder(config.airflow_image_ref(), &identity.name)
            .envs(resolved.iter())
            .volumes(airflow_mounts(config, resolved))
            .detach(!role.runs_in_foreground());

        let builder = match role {
            ServiceRole::SchemaInit => builder.command(["initdb"]),
            ServiceRole::Scheduler => builder.command(["scheduler"]),
            ServiceRole::Worker => {
                let base = self.worker.log_server_port;
                let offset = u16::try_from(identity.existing).unwrap_or(u16::MAX);
                builder
                    .command(["worker", "-q", self.worker.queue.as_str()])
                    .port(PortBinding {
                        host: base.saturating_add(offset),
                        container: base,
                    })
            }
            ServiceRole::WebServer => builder
                .command(["webserver".to_string(), "-p".to_string(), config.webserver_port.to_string()])
                .port(PortBinding::same(config.webserver_port)),
            ServiceRole::MonitorUI => builder
                .command(["flower".to_string(), "-p".to_string(), config.flower_port.to_string()])
                .port(PortBinding::same(config.flower_port)),
            ServiceRole::Database | ServiceRole::Broker => builder,
        };
        builder.build()
    }

    /// Start `role` under `identity`. Runtime failures, including name
    /// collisions, come back as [`Error::Launch`].
    pub async fn launch(
        &self,
        role: ServiceRole,
        config: &Config,
        resolved: &ResolvedConfig,
        identity: &Identity,
    ) -> Result<ContainerHandle> {
        let spec = self.build_spec(role, config, resolved, identity);
        self.runtime.run(&spec).await.map_err(|e| Error::Launch {
            service: spec.name().to_string(),
            message: e.to_string(),
        })
    }
}

/// `dags/` and `logs/` under `local-dir`, then custom mounts.
fn airflow_mounts(config: &Config, resolved: &ResolvedConfig) -> Vec<VolumeMount> {
    let defaults = vec![
        VolumeMount::new(format!("{}/dags", config.local_dir), resolved.dags_folder()),
        VolumeMount::new(format!("{}/logs", config.local_dir), resolved.base_log_folder()),
    ];
    let custom: Vec<VolumeMount> = config
        .custom_mount_volumes
        .iter()
        .map(|m| VolumeMount::new(&m.host_path, &m.container_path))
        .collect();
    merge_mounts(defaults, &custom)
}
