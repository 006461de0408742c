use super::{NetworkProbes, ProbeFactory};
use crate::config::{Config, ResolvedConfig};
use crate::docker::{ContainerHandle, ContainerRuntime};
use crate::error::{Error, Result};
use crate::healthcheck::{DependencyCheck, ReadinessPolicy, ReadinessProber};
use crate::retry::RetryPolicy;
use crate::service::{
    Identity, InstanceRegistry, LaunchMode, RunTarget, ServiceLauncher, ServiceRole, WorkerOptions,
};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Connect timeout for a single database or broker probe attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Address used in operator URLs when the host name cannot be resolved.
pub const FALLBACK_HOST_ADDRESS: &str = "127.0.0.1";

/// Runtime knobs for one orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub readiness_policy: ReadinessPolicy,
    pub worker: WorkerOptions,
    /// Prune stopped containers and pull the Airflow image before launching.
    pub prepare_images: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            readiness_policy: ReadinessPolicy::default(),
            worker: WorkerOptions::default(),
            prepare_images: true,
        }
    }
}

/// Sequencer state.
///
/// ```text
/// Idle ──► ResolvingConfig ──► ProbingDependencies ──► Launching ──► Done
///                │                     │    ▲              │
///                │                     │    └──────────────┤ (next role)
///                ▼                     ▼                   ▼
///              Failed ◄────────────────┴───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationState {
    Idle,
    ResolvingConfig,
    ProbingDependencies,
    Launching,
    Done,
    Failed,
}

impl OrchestrationState {
    pub fn is_valid_transition(&self, to: OrchestrationState) -> bool {
        use OrchestrationState::*;
        match (self, to) {
            (Idle | Done | Failed, ResolvingConfig) => true,
            (ResolvingConfig, ProbingDependencies | Launching | Done | Failed) => true,
            (ProbingDependencies, Launching | Done | Failed) => true,
            // A role with dependencies follows the previous launch, or one
            // that was skipped while still probing.
            (Launching | ProbingDependencies, ProbingDependencies) => true,
            (Launching, Launching | Done | Failed) => true,
            (s1, s2) if *s1 == s2 => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestrationState::Done | OrchestrationState::Failed)
    }
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrchestrationState::Idle => "idle",
            OrchestrationState::ResolvingConfig => "resolving-config",
            OrchestrationState::ProbingDependencies => "probing-dependencies",
            OrchestrationState::Launching => "launching",
            OrchestrationState::Done => "done",
            OrchestrationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What happened to one role of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched(ContainerHandle),
    /// An instance with the base name was already running.
    Skipped { name: String },
    /// Dependencies never became ready under the fail-soft policy.
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub role: ServiceRole,
    pub outcome: LaunchOutcome,
}

/// Sequences readiness probes and launches for a [`RunTarget`].
///
/// One step runs at a time: no two probes or launches overlap. Cancelling the
/// token stops the sequence before the next step and interrupts any backoff
/// sleep in progress.
pub struct Orchestrator {
    config: Config,
    runtime: Arc<dyn ContainerRuntime>,
    probes: Arc<dyn ProbeFactory>,
    options: OrchestratorOptions,
    cancellation_token: CancellationToken,
    state: OrchestrationState,
    host_address: String,
}

impl Orchestrator {
    pub fn builder() -> crate::orchestrator::OrchestratorBuilder {
        crate::orchestrator::OrchestratorBuilder::new()
    }

    pub(super) fn from_parts(
        config: Config,
        runtime: Arc<dyn ContainerRuntime>,
        probes: Option<Arc<dyn ProbeFactory>>,
        options: OrchestratorOptions,
        cancellation_token: CancellationToken,
        host_address: String,
    ) -> Self {
        Self {
            config,
            runtime,
            probes: probes.unwrap_or_else(|| Arc::new(NetworkProbes)),
            options,
            cancellation_token,
            state: OrchestrationState::Idle,
            host_address,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn state(&self) -> OrchestrationState {
        self.state
    }

    pub fn host_address(&self) -> &str {
        &self.host_address
    }

    /// Cancel in-progress and future steps of [`run`](Self::run).
    pub fn cancel_operations(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Resolve config, then probe and launch every role of `target` in order.
    ///
    /// Partial progress of a composite run is not rolled back on failure.
    pub async fn run(&mut self, target: RunTarget) -> Result<Vec<StepReport>> {
        match self.run_plan(target).await {
            Ok(reports) => {
                self.set_state(OrchestrationState::Done);
                Ok(reports)
            }
            Err(e) => {
                self.set_state(OrchestrationState::Failed);
                Err(e)
            }
        }
    }

    async fn run_plan(&mut self, target: RunTarget) -> Result<Vec<StepReport>> {
        self.set_state(OrchestrationState::ResolvingConfig);
        let resolved = ResolvedConfig::resolve(&self.config)?;
        tracing::debug!("Resolved {} environment entries", resolved.len());

        if self.options.prepare_images {
            self.prepare_images().await;
        }

        let registry = InstanceRegistry::for_config(Arc::clone(&self.runtime), &self.config);
        let launcher = ServiceLauncher::new(Arc::clone(&self.runtime), self.options.worker.clone());
        let prober = ReadinessProber::new(self.cancellation_token.clone());

        let mut reports = Vec::new();
        for role in target.plan() {
            if self.cancellation_token.is_cancelled() {
                return Err(Error::Cancelled(format!("run {}", target)));
            }
            let outcome = self
                .run_role(role, target.launch_mode(role), &resolved, &registry, &launcher, &prober)
                .await?;
            reports.push(StepReport { role, outcome });
        }
        Ok(reports)
    }

    async fn run_role(
        &mut self,
        role: ServiceRole,
        mode: LaunchMode,
        resolved: &ResolvedConfig,
        registry: &InstanceRegistry,
        launcher: &ServiceLauncher,
        prober: &ReadinessProber,
    ) -> Result<LaunchOutcome> {
        let base_name = role.container_name(&self.config);

        if role == ServiceRole::Database {
            let image = self.config.postgresql.image_ref();
            if let Err(e) = self.runtime.pull_image(&image).await {
                tracing::warn!("Failed to pull {}: {}", image, e);
            }
        }

        if mode == LaunchMode::Ensure && registry.exists_exact_name(&base_name).await? {
            tracing::warn!("Container {} already exists.", base_name);
            return Ok(LaunchOutcome::Skipped { name: base_name });
        }

        let dependencies = role.dependencies();
        if !dependencies.is_empty() {
            self.set_state(OrchestrationState::ProbingDependencies);
            let checks = dependencies
                .iter()
                .map(|kind| {
                    self.probes
                        .probe(*kind, &self.config, resolved, self.options.connect_timeout)
                        .map(|probe| DependencyCheck::new(probe, self.options.retry))
                })
                .collect::<Result<Vec<_>>>()?;

            if !prober.check_all(&checks, self.options.readiness_policy).await? {
                tracing::warn!("Skipping {}: dependencies are not ready", role);
                return Ok(LaunchOutcome::NotReady);
            }
        }

        self.set_state(OrchestrationState::Launching);

        if role == ServiceRole::SchemaInit {
            tracing::info!("Running airflow initdb...");
            if let Err(e) = self.runtime.prune().await {
                tracing::warn!("Failed to prune stopped containers: {}", e);
            }
        } else {
            tracing::info!("Starting {}...", role);
        }

        let identity = match mode {
            LaunchMode::ScaleOut => registry.next_identity(role, &base_name).await?,
            LaunchMode::Ensure => Identity::new(base_name, 0),
        };
        if role == ServiceRole::Worker {
            tracing::info!("Worker queue: {}", self.options.worker.queue);
        }

        let handle = launcher.launch(role, &self.config, resolved, &identity).await?;

        if let Some((label, url)) = operator_url(role, &self.config, &self.host_address) {
            tracing::info!("{} url: {}", label, url);
        }

        Ok(LaunchOutcome::Launched(handle))
    }

    async fn prepare_images(&self) {
        if let Err(e) = self.runtime.prune().await {
            tracing::warn!("Failed to prune stopped containers: {}", e);
        }
        let image = self.config.airflow_image_ref();
        tracing::info!("Pulling {}...", image);
        if let Err(e) = self.runtime.pull_image(&image).await {
            tracing::warn!("Failed to pull {}: {}", image, e);
        }
    }

    fn set_state(&mut self, to: OrchestrationState) {
        if !self.state.is_valid_transition(to) {
            tracing::warn!("Unexpected orchestration transition {} -> {}", self.state, to);
        }
        tracing::debug!("Orchestration state: {} -> {}", self.state, to);
        self.state = to;
    }
}

/// Operator-facing URL of a role with a UI, as `(label, host:port)`.
pub fn operator_url(role: ServiceRole, config: &Config, host: &str) -> Option<(&'static str, String)> {
    match role {
        ServiceRole::Broker => Some(("Rabbitmq UI", format!("{}:{}", host, config.rabbitmq.ui_port))),
        ServiceRole::WebServer => Some(("Webserver", format!("{}:{}", host, config.webserver_port))),
        ServiceRole::MonitorUI => Some(("Flower", format!("{}:{}", host, config.flower_port))),
        _ => None,
    }
}

/// This host's address for operator URLs: the host name resolved to an IP,
/// preferring IPv4, or [`FALLBACK_HOST_ADDRESS`].
pub async fn detect_host_address() -> String {
    let hostname = match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::debug!("gethostname failed: {}", e);
            return FALLBACK_HOST_ADDRESS.to_string();
        }
    };

    let address = match tokio::net::lookup_host((hostname.as_str(), 0)).await {
        Ok(addrs) => {
            let ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
            ips.iter()
                .find(|ip| ip.is_ipv4())
                .or_else(|| ips.first())
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| FALLBACK_HOST_ADDRESS.to_string())
        }
        Err(e) => {
            tracing::debug!("Could not resolve host name {}: {}", hostname, e);
            FALLBACK_HOST_ADDRESS.to_string()
        }
    };
    address
}
