//! Shared fixtures: a recording in-memory container runtime, scripted
//! readiness probes and a complete config document.

#![allow(dead_code)]

use airflow_run::config::{Config, ResolvedConfig};
use airflow_run::docker::{ContainerHandle, ContainerRuntime, DockerError, RunningInstance};
use airflow_run::healthcheck::{DependencyKind, ReadinessProbe};
use airflow_run::orchestrator::ProbeFactory;
use airflow_run::service::LaunchSpec;
use airflow_run::{Error, Parser};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CONFIG_YAML: &str = r#"
environment-overrides:
  AIRFLOW__CORE__EXECUTOR: CeleryExecutor
  AIRFLOW__CORE__LOAD_EXAMPLES: "False"
private-registry-flag: false
registry-url: registry.example.com
repository: data/airflow
image: airflow-custom
tag: "1.10.9"
username:
password:
local-dir: /srv/airflow
webserver-port: 8080
flower-port: 5555
rabbitmq:
  name: rabbitmq
  username: guest
  password: guest
  host: mq1
  virtual-host: airflow
  image: rabbitmq:3-management
  home: /var/lib/rabbitmq
  ui-port: 15672
  port: 5672
  env:
    RABBITMQ_DEFAULT_USER: guest
    RABBITMQ_DEFAULT_PASS: guest
postgresql:
  name: postgresql
  username: u
  password: p
  host: db1
  image: postgres
  tag: "12"
  data: /var/lib/postgresql/data
  port: 5432
  env:
    POSTGRES_USER: u
    POSTGRES_PASSWORD: p
"#;

pub fn config() -> Config {
    Parser::new().parse_config(CONFIG_YAML).unwrap()
}

pub fn config_from(yaml: &str) -> Config {
    Parser::new().parse_config(yaml).unwrap()
}

/// Everything the mock runtime and the scripted probes observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Pull(String),
    List,
    Run { name: String, command: Vec<String> },
    Kill(String),
    Prune,
    Build { tag: String, build_args: BTreeMap<String, String> },
    Tag { source: String, target: String },
    Push { repository: String, tag: String },
    Login { registry: String, username: String },
    Probe(DependencyKind),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Launched `docker run` names, in order.
pub fn launched(log: &EventLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Run { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// In-memory runtime. Detached runs join the running set; foreground runs
/// complete immediately and leave nothing behind.
pub struct MockRuntime {
    pub log: EventLog,
    running: Mutex<Vec<RunningInstance>>,
    specs: Mutex<Vec<LaunchSpec>>,
    next_id: AtomicU32,
    pub fail_login: bool,
    /// Names `run` rejects as already in use, as if a racing orchestrator took them.
    pub conflicting_names: Vec<String>,
}

impl MockRuntime {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            running: Mutex::new(Vec::new()),
            specs: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
            fail_login: false,
            conflicting_names: Vec::new(),
        }
    }

    pub fn with_running(self, names: &[&str]) -> Self {
        {
            let mut running = self.running.lock().unwrap();
            for name in names {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                running.push(RunningInstance::new(format!("c{:04}", id), *name));
            }
        }
        self
    }

    pub fn specs(&self) -> Vec<LaunchSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn running_names(&self) -> Vec<String> {
        self.running.lock().unwrap().iter().map(|r| r.name.clone()).collect()
    }

    fn record(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        self.record(Event::Pull(image.to_string()));
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<RunningInstance>, DockerError> {
        self.record(Event::List);
        Ok(self.running.lock().unwrap().clone())
    }

    async fn run(&self, spec: &LaunchSpec) -> Result<ContainerHandle, DockerError> {
        self.record(Event::Run {
            name: spec.name().to_string(),
            command: spec.command().to_vec(),
        });
        self.specs.lock().unwrap().push(spec.clone());

        let mut running = self.running.lock().unwrap();
        if self.conflicting_names.iter().any(|n| n == spec.name())
            || running.iter().any(|r| r.name == spec.name())
        {
            return Err(DockerError::NameConflict {
                name: spec.name().to_string(),
            });
        }

        if !spec.detach() {
            return Ok(ContainerHandle {
                id: None,
                name: spec.name().to_string(),
            });
        }

        let id = format!("c{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        running.push(RunningInstance::new(id.clone(), spec.name()));
        Ok(ContainerHandle {
            id: Some(id),
            name: spec.name().to_string(),
        })
    }

    async fn kill(&self, name: &str) -> Result<(), DockerError> {
        self.record(Event::Kill(name.to_string()));
        let mut running = self.running.lock().unwrap();
        let before = running.len();
        running.retain(|r| r.name != name);
        if running.len() == before {
            return Err(DockerError::ContainerNotFound {
                container: name.to_string(),
            });
        }
        Ok(())
    }

    async fn prune(&self) -> Result<(), DockerError> {
        self.record(Event::Prune);
        Ok(())
    }

    async fn build_image(
        &self,
        _context: &Path,
        build_args: &BTreeMap<String, String>,
        tag: &str,
    ) -> Result<(), DockerError> {
        self.record(Event::Build {
            tag: tag.to_string(),
            build_args: build_args.clone(),
        });
        Ok(())
    }

    async fn tag_image(&self, source: &str, target: &str) -> Result<(), DockerError> {
        self.record(Event::Tag {
            source: source.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    async fn push_image(&self, repository: &str, tag: &str) -> Result<(), DockerError> {
        self.record(Event::Push {
            repository: repository.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }

    async fn login(&self, registry: &str, username: &str, _password: &str) -> Result<(), DockerError> {
        self.record(Event::Login {
            registry: registry.to_string(),
            username: username.to_string(),
        });
        if self.fail_login {
            return Err(DockerError::cmd_failed(
                format!("docker login {}", registry),
                "unauthorized: incorrect username or password",
                Some(1),
            ));
        }
        Ok(())
    }
}

/// Probe that fails until attempt `ready_on` (never, when `None`).
pub struct ScriptedProbe {
    kind: DependencyKind,
    ready_on: Option<u32>,
    calls: AtomicU32,
    log: EventLog,
}

#[async_trait]
impl ReadinessProbe for ScriptedProbe {
    fn kind(&self) -> DependencyKind {
        self.kind
    }

    async fn check(&self) -> airflow_run::Result<bool> {
        self.log.lock().unwrap().push(Event::Probe(self.kind));
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.ready_on {
            Some(target) if n >= target => Ok(true),
            _ => Err(Error::Probe {
                check: self.kind.to_string(),
                message: format!("connection refused (attempt {})", n),
            }),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }
}

/// Hands out [`ScriptedProbe`]s; probe state persists across roles so a
/// dependency that became ready stays ready.
pub struct ScriptedProbes {
    log: EventLog,
    ready_on: HashMap<DependencyKind, Option<u32>>,
    probes: Mutex<HashMap<DependencyKind, Arc<ScriptedProbe>>>,
}

impl ScriptedProbes {
    /// Both dependencies ready on the first attempt.
    pub fn ready(log: EventLog) -> Self {
        Self::new(log, Some(1), Some(1))
    }

    pub fn new(log: EventLog, database_ready_on: Option<u32>, broker_ready_on: Option<u32>) -> Self {
        let mut ready_on = HashMap::new();
        ready_on.insert(DependencyKind::Database, database_ready_on);
        ready_on.insert(DependencyKind::Broker, broker_ready_on);
        Self {
            log,
            ready_on,
            probes: Mutex::new(HashMap::new()),
        }
    }
}

impl ProbeFactory for ScriptedProbes {
    fn probe(
        &self,
        kind: DependencyKind,
        _config: &Config,
        _resolved: &ResolvedConfig,
        _connect_timeout: Duration,
    ) -> airflow_run::Result<Arc<dyn ReadinessProbe>> {
        let mut probes = self.probes.lock().unwrap();
        let probe: Arc<dyn ReadinessProbe> = probes
            .entry(kind)
            .or_insert_with(|| {
                Arc::new(ScriptedProbe {
                    kind,
                    ready_on: self.ready_on.get(&kind).copied().flatten(),
                    calls: AtomicU32::new(0),
                    log: Arc::clone(&self.log),
                })
            })
            .clone();
        Ok(probe)
    }
}
