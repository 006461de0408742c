use crate::config::Config;
use crate::error::{Error, Result};
use crate::healthcheck::DependencyKind;
use std::fmt;
use std::str::FromStr;

/// Names accepted by `--run`, in the order they are listed to the operator.
pub const SUPPORTED_SERVICES: &[&str] = &[
    "flower",
    "initdb",
    "postgresql",
    "postgres",
    "rabbitmq",
    "scheduler",
    "webserver",
    "worker",
    "list",
    "airflow_scheduler",
    "airflow_webserver",
    "airflow_worker",
    "all",
];

/// One of the fixed services of a Celery-executor deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceRole {
    Database,
    Broker,
    SchemaInit,
    Scheduler,
    Worker,
    WebServer,
    MonitorUI,
}

/// Launch order of `--run all`. SchemaInit runs twice: once as soon as the
/// database is up and again once the broker is.
pub const FULL_STACK_SEQUENCE: &[ServiceRole] = &[
    ServiceRole::Database,
    ServiceRole::SchemaInit,
    ServiceRole::Broker,
    ServiceRole::SchemaInit,
    ServiceRole::Scheduler,
    ServiceRole::Worker,
    ServiceRole::WebServer,
];

impl ServiceRole {
    pub const ALL: &'static [ServiceRole] = &[
        ServiceRole::Database,
        ServiceRole::Broker,
        ServiceRole::SchemaInit,
        ServiceRole::Scheduler,
        ServiceRole::Worker,
        ServiceRole::WebServer,
        ServiceRole::MonitorUI,
    ];

    /// Logical service name.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceRole::Database => "postgresql",
            ServiceRole::Broker => "rabbitmq",
            ServiceRole::SchemaInit => "initdb",
            ServiceRole::Scheduler => "scheduler",
            ServiceRole::Worker => "worker",
            ServiceRole::WebServer => "webserver",
            ServiceRole::MonitorUI => "flower",
        }
    }

    /// Base container name. Database and broker names come from config.
    pub fn container_name(&self, config: &Config) -> String {
        match self {
            ServiceRole::Database => config.postgresql.name.clone(),
            ServiceRole::Broker => config.rabbitmq.name.clone(),
            other => format!("airflow_{}", other.name()),
        }
    }

    /// Dependencies that must be reachable before this role launches.
    pub fn dependencies(&self) -> &'static [DependencyKind] {
        match self {
            ServiceRole::Database | ServiceRole::Broker => &[],
            ServiceRole::SchemaInit => &[DependencyKind::Database],
            ServiceRole::Scheduler
            | ServiceRole::Worker
            | ServiceRole::WebServer
            | ServiceRole::MonitorUI => &[DependencyKind::Database, DependencyKind::Broker],
        }
    }

    /// SchemaInit is a one-shot job and is waited on.
    pub fn runs_in_foreground(&self) -> bool {
        matches!(self, ServiceRole::SchemaInit)
    }

    /// Roles that may run several instances side by side.
    pub fn is_scalable(&self) -> bool {
        matches!(self, ServiceRole::Worker)
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServiceRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "postgresql" | "postgres" => Ok(ServiceRole::Database),
            "rabbitmq" => Ok(ServiceRole::Broker),
            "initdb" => Ok(ServiceRole::SchemaInit),
            "scheduler" | "airflow_scheduler" => Ok(ServiceRole::Scheduler),
            "worker" | "airflow_worker" => Ok(ServiceRole::Worker),
            "webserver" | "airflow_webserver" => Ok(ServiceRole::WebServer),
            "flower" | "airflow_flower" => Ok(ServiceRole::MonitorUI),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// How an already running instance of a role is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Skip the role when its base name is already running.
    Ensure,
    /// Always launch another instance under the next free name.
    ScaleOut,
}

/// What `--run` asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTarget {
    Role(ServiceRole),
    All,
}

impl RunTarget {
    /// Roles to launch, in order.
    pub fn plan(&self) -> Vec<ServiceRole> {
        match self {
            RunTarget::Role(role) => vec![*role],
            RunTarget::All => FULL_STACK_SEQUENCE.to_vec(),
        }
    }

    /// Requesting a single scalable role adds an instance; everything else
    /// is idempotent by name.
    pub fn launch_mode(&self, role: ServiceRole) -> LaunchMode {
        match self {
            RunTarget::Role(requested) if *requested == role && role.is_scalable() => {
                LaunchMode::ScaleOut
            }
            _ => LaunchMode::Ensure,
        }
    }
}

impl FromStr for RunTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(RunTarget::All),
            other => other.parse().map(RunTarget::Role),
        }
    }
}

impl fmt::Display for RunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunTarget::Role(role) => write!(f, "{}", role),
            RunTarget::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_the_same_role() {
        assert_eq!("postgres".parse::<ServiceRole>().unwrap(), ServiceRole::Database);
        assert_eq!("postgresql".parse::<ServiceRole>().unwrap(), ServiceRole::Database);
        assert_eq!("airflow_worker".parse::<ServiceRole>().unwrap(), ServiceRole::Worker);
        assert_eq!("flower".parse::<ServiceRole>().unwrap(), ServiceRole::MonitorUI);
    }

    #[test]
    fn unknown_name_is_invalid_role() {
        let err = "list".parse::<RunTarget>().unwrap_err();
        assert!(matches!(err, Error::InvalidRole(ref name) if name == "list"));
    }

    #[test]
    fn schema_init_needs_only_the_database() {
        assert_eq!(ServiceRole::SchemaInit.dependencies(), &[DependencyKind::Database]);
        assert!(ServiceRole::Database.dependencies().is_empty());
        assert_eq!(
            ServiceRole::MonitorUI.dependencies(),
            &[DependencyKind::Database, DependencyKind::Broker]
        );
    }

    #[test]
    fn all_runs_schema_init_twice() {
        let plan = RunTarget::All.plan();
        assert_eq!(plan.len(), 7);
        assert_eq!(
            plan.iter().filter(|r| **r == ServiceRole::SchemaInit).count(),
            2
        );
        assert!(!plan.contains(&ServiceRole::MonitorUI));
    }

    #[test]
    fn only_a_single_worker_request_scales_out() {
        assert_eq!(
            RunTarget::Role(ServiceRole::Worker).launch_mode(ServiceRole::Worker),
            LaunchMode::ScaleOut
        );
        assert_eq!(RunTarget::All.launch_mode(ServiceRole::Worker), LaunchMode::Ensure);
        assert_eq!(
            RunTarget::Role(ServiceRole::Scheduler).launch_mode(ServiceRole::Scheduler),
            LaunchMode::Ensure
        );
    }
}
