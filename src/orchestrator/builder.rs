use super::{detect_host_address, Orchestrator, OrchestratorOptions, ProbeFactory};
use crate::config::Config;
use crate::docker::{login_if_configured, ContainerRuntime, DockerClient};
use crate::error::{Error, Result};
use crate::healthcheck::ReadinessPolicy;
use crate::retry::RetryPolicy;
use crate::service::WorkerOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for constructing an `Orchestrator` with a fluent API.
///
/// `build()` logs in to the private registry when the config asks for it, so
/// a returned orchestrator is ready to pull and launch.
///
/// # Example
///
/// ```no_run
/// use airflow_run::{Orchestrator, Parser, RunTarget};
///
/// # async fn example() -> Result<(), airflow_run::Error> {
/// let config = Parser::new().load_config("config.yaml")?;
/// let mut orchestrator = Orchestrator::builder()
///     .config(config)
///     .max_retries(5)
///     .build()
///     .await?;
/// orchestrator.run(RunTarget::All).await?;
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    config: Option<Config>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    probes: Option<Arc<dyn ProbeFactory>>,
    options: OrchestratorOptions,
    cancellation_token: Option<CancellationToken>,
    host_address: Option<String>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            runtime: None,
            probes: None,
            options: OrchestratorOptions::default(),
            cancellation_token: None,
            host_address: None,
        }
    }

    /// Set the configuration. Required.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Container runtime to launch through. Defaults to [`DockerClient`].
    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Readiness probe source. Defaults to real network probes.
    pub fn probes(mut self, probes: Arc<dyn ProbeFactory>) -> Self {
        self.probes = Some(probes);
        self
    }

    pub fn options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.options.retry = policy;
        self
    }

    /// Re-attempts per dependency check after the first try.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.options.retry.max_retries = max_retries;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    pub fn readiness_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.options.readiness_policy = policy;
        self
    }

    pub fn worker_options(mut self, worker: WorkerOptions) -> Self {
        self.options.worker = worker;
        self
    }

    pub fn prepare_images(mut self, prepare: bool) -> Self {
        self.options.prepare_images = prepare;
        self
    }

    /// Share a token with the caller, e.g. one cancelled on Ctrl-C.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Address shown in operator URLs. Detected from the host name if unset.
    pub fn host_address(mut self, address: impl Into<String>) -> Self {
        self.host_address = Some(address.into());
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no config was set
    /// - [`Error::RegistryAuth`] if the private registry login fails
    pub async fn build(self) -> Result<Orchestrator> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("config is required".to_string()))?;
        let runtime = self
            .runtime
            .unwrap_or_else(|| Arc::new(DockerClient::new()));

        login_if_configured(runtime.as_ref(), &config).await?;

        let host_address = match self.host_address {
            Some(address) => address,
            None => detect_host_address().await,
        };

        Ok(Orchestrator::from_parts(
            config,
            runtime,
            self.probes,
            self.options,
            self.cancellation_token.unwrap_or_default(),
            host_address,
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
