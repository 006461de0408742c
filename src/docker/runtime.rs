//! The container runtime capability the orchestrator is written against.

use super::DockerError;
use crate::service::LaunchSpec;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// A running container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningInstance {
    /// Short container id.
    pub id: String,
    pub name: String,
}

impl RunningInstance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Result of a successful `run`.
///
/// Foreground runs wait for the container to exit and have no id to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: Option<String>,
    pub name: String,
}

/// Container lifecycle primitives.
///
/// [`DockerClient`](super::DockerClient) implements this over the docker CLI;
/// tests substitute an in-memory recorder.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &str) -> Result<(), DockerError>;

    /// Running containers only, in the order the runtime reports them.
    async fn list_containers(&self) -> Result<Vec<RunningInstance>, DockerError>;

    /// Start a container. Name collisions surface as [`DockerError::NameConflict`].
    async fn run(&self, spec: &LaunchSpec) -> Result<ContainerHandle, DockerError>;

    async fn kill(&self, name: &str) -> Result<(), DockerError>;

    /// Remove stopped containers.
    async fn prune(&self) -> Result<(), DockerError>;

    async fn build_image(
        &self,
        context: &Path,
        build_args: &BTreeMap<String, String>,
        tag: &str,
    ) -> Result<(), DockerError>;

    async fn tag_image(&self, source: &str, target: &str) -> Result<(), DockerError>;

    async fn push_image(&self, repository: &str, tag: &str) -> Result<(), DockerError>;

    async fn login(&self, registry: &str, username: &str, password: &str) -> Result<(), DockerError>;
}
