use super::{docker_client, load_config};
use crate::cli::Cli;
use crate::output::UserOutput;
use airflow_run::orchestrator::{LaunchOutcome, StepReport};
use airflow_run::service::{WorkerOptions, SUPPORTED_SERVICES};
use airflow_run::{Error, Orchestrator, RunTarget};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run_services(cli: &Cli, service: &str, out: &dyn UserOutput) -> anyhow::Result<()> {
    let target = match service.parse::<RunTarget>() {
        Ok(target) => target,
        Err(Error::InvalidRole(_)) => {
            print_supported_services(out);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let config = load_config(&cli.config)?;
    let client = docker_client().await?;

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling...");
            ctrl_c.cancel();
        }
    });

    let mut orchestrator = Orchestrator::builder()
        .config(config)
        .runtime(Arc::new(client))
        .max_retries(cli.max_retries)
        .worker_options(WorkerOptions {
            queue: cli.queue.clone(),
            log_server_port: cli.worker_log_server_port,
        })
        .cancellation_token(token)
        .build()
        .await?;

    let reports = orchestrator.run(target).await?;
    print_reports(&reports, out);
    Ok(())
}

fn print_supported_services(out: &dyn UserOutput) {
    out.blank();
    out.status("Available services:");
    out.status("-------------------");
    for (index, name) in SUPPORTED_SERVICES.iter().enumerate() {
        out.status(&format!("{}. {}", index, name));
    }
}

fn print_reports(reports: &[StepReport], out: &dyn UserOutput) {
    for report in reports {
        match &report.outcome {
            LaunchOutcome::Launched(handle) => match &handle.id {
                Some(id) => out.success(&format!("{}: started {} ({})", report.role, handle.name, id)),
                None => out.success(&format!("{}: {} completed", report.role, handle.name)),
            },
            LaunchOutcome::Skipped { name } => {
                out.status(&format!("{}: {} already running", report.role, name))
            }
            LaunchOutcome::NotReady => {
                out.warning(&format!("{}: skipped, dependencies not ready", report.role))
            }
        }
    }
}
