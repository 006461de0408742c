mod cli;
mod commands;
mod output;

use airflow_run::Error as AfrError;
use clap::{CommandFactory, Parser};
use cli::Cli;
use output::CliOutput;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(afr_error) = e.downcast_ref::<AfrError>() {
            eprintln!("Error: {}", afr_error.with_suggestion());
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log)?;

    if !cli.has_action() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let out = CliOutput;

    if cli.build {
        commands::run_build(&cli.config, &cli.dockerfile, &out).await
    } else if cli.generate_config {
        commands::run_generate_config(&std::env::current_dir()?, &out)
    } else if cli.list {
        commands::run_list(&cli.config, &out).await
    } else if cli.kill {
        commands::run_kill(&cli.config, &out).await
    } else if cli.pull {
        commands::run_pull(&cli.config, &out).await
    } else if let Some(service) = cli.run.as_deref() {
        commands::run_services(&cli, service, &out).await
    } else {
        Ok(())
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
