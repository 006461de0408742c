use airflow_run::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use airflow_run::retry::DEFAULT_MAX_RETRIES;
use airflow_run::service::{DEFAULT_QUEUE, DEFAULT_WORKER_LOG_SERVER_PORT};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "afr")]
#[command(about = "Airflow Run - launch a Celery-executor Airflow deployment with Docker")]
pub struct Cli {
    /// Service to run: postgresql, rabbitmq, initdb, scheduler, worker,
    /// webserver, flower, or all
    #[arg(long, value_name = "SERVICE")]
    pub run: Option<String>,

    /// Build the Airflow image from --dockerfile and push it to the private registry
    #[arg(long)]
    pub build: bool,

    /// Pull the Airflow image
    #[arg(long)]
    pub pull: bool,

    /// List running services
    #[arg(long)]
    pub list: bool,

    /// Kill running services
    #[arg(long)]
    pub kill: bool,

    /// Generate a config.yaml in the current directory
    #[arg(long)]
    pub generate_config: bool,

    /// Path to the config file
    #[arg(long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Path to the Dockerfile used by --build
    #[arg(long, default_value = "./Dockerfile")]
    pub dockerfile: PathBuf,

    /// Queue consumed by the worker
    #[arg(long, default_value = DEFAULT_QUEUE)]
    pub queue: String,

    /// Worker log-server port inside the container
    #[arg(long, default_value_t = DEFAULT_WORKER_LOG_SERVER_PORT)]
    pub worker_log_server_port: u16,

    /// Re-attempts per dependency check before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Show debug logs
    #[arg(long)]
    pub log: bool,
}

impl Cli {
    /// Whether any action flag was given.
    pub fn has_action(&self) -> bool {
        self.run.is_some() || self.build || self.pull || self.list || self.kill || self.generate_config
    }
}
