//! Docker access for the orchestrator.
//!
//! [`ContainerRuntime`] is the capability the rest of the crate depends on;
//! [`DockerClient`] implements it by shelling out to the docker CLI.

pub mod client;
pub mod error;
pub mod image;
pub mod runtime;

pub use client::DockerClient;
pub use error::DockerError;
pub use image::{build_and_push, pull_airflow_image};
pub use runtime::{ContainerHandle, ContainerRuntime, RunningInstance};

use crate::config::Config;
use crate::error::{Error, Result};
use std::time::Duration;

/// Fail early with [`DockerError::DaemonUnavailable`] when `docker info` does
/// not answer within `timeout`.
pub async fn require_daemon(client: &DockerClient, timeout: Duration) -> std::result::Result<(), DockerError> {
    if client.daemon_healthy(timeout).await {
        Ok(())
    } else {
        Err(DockerError::DaemonUnavailable)
    }
}

/// Log in to the configured registry when the private-registry flag and both
/// credentials are set. Returns whether a login was attempted.
pub async fn login_if_configured(runtime: &dyn ContainerRuntime, config: &Config) -> Result<bool> {
    let Some((username, password)) = config.registry_credentials() else {
        return Ok(false);
    };

    tracing::debug!("Logging in to registry {}", config.registry_url);
    runtime
        .login(&config.registry_url, username, password)
        .await
        .map_err(|e| Error::RegistryAuth {
            registry: config.registry_url.clone(),
            message: e.to_string(),
        })?;
    Ok(true)
}
