use super::ServiceRole;
use crate::config::Config;
use crate::docker::{ContainerRuntime, DockerError, RunningInstance};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Name and instance count chosen for a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    /// Instances of the same base name already running; offsets the worker
    /// log-server host port.
    pub existing: usize,
}

impl Identity {
    pub fn new(name: impl Into<String>, existing: usize) -> Self {
        Self {
            name: name.into(),
            existing,
        }
    }
}

/// Queries the runtime for running instances of supported services.
///
/// Nothing is cached: every call lists containers afresh.
#[derive(Clone)]
pub struct InstanceRegistry {
    runtime: Arc<dyn ContainerRuntime>,
    supported: BTreeSet<String>,
}

impl InstanceRegistry {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, supported: BTreeSet<String>) -> Self {
        Self { runtime, supported }
    }

    /// Supported names are every role's logical name and base container name,
    /// including the configured database and broker names.
    pub fn for_config(runtime: Arc<dyn ContainerRuntime>, config: &Config) -> Self {
        let mut supported = BTreeSet::new();
        for role in ServiceRole::ALL {
            supported.insert(role.name().to_string());
            supported.insert(role.container_name(config));
        }
        supported.insert("postgres".to_string());
        Self::new(runtime, supported)
    }

    /// Whether `name` belongs to a supported service: either a base name or a
    /// base name followed by `_<n>`.
    pub fn is_supported(&self, name: &str) -> bool {
        if self.supported.contains(name) {
            return true;
        }
        match name.rsplit_once('_') {
            Some((base, suffix)) => {
                !suffix.is_empty()
                    && suffix.chars().all(|c| c.is_ascii_digit())
                    && self.supported.contains(base)
            }
            None => false,
        }
    }

    /// Running supported containers.
    pub async fn running(&self) -> Result<Vec<RunningInstance>, DockerError> {
        let all = self.runtime.list_containers().await?;
        Ok(all.into_iter().filter(|c| self.is_supported(&c.name)).collect())
    }

    /// Next name for `base_name`: the base itself when nothing matches,
    /// otherwise `base_name_<count>` where count is the number of matches.
    pub async fn next_identity(&self, role: ServiceRole, base_name: &str) -> Result<Identity, DockerError> {
        let existing = self
            .running()
            .await?
            .iter()
            .filter(|c| c.name.contains(base_name))
            .count();

        let identity = if existing == 0 {
            Identity::new(base_name, 0)
        } else {
            Identity::new(format!("{}_{}", base_name, existing), existing)
        };
        tracing::debug!(
            "{} identity: {} ({} already running)",
            role,
            identity.name,
            existing
        );
        Ok(identity)
    }

    pub async fn exists_exact_name(&self, name: &str) -> Result<bool, DockerError> {
        Ok(self.running().await?.iter().any(|c| c.name == name))
    }
}
