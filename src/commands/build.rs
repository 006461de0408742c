use super::{docker_client, load_config};
use crate::output::UserOutput;
use airflow_run::docker::{build_and_push, login_if_configured};
use std::path::Path;

pub async fn run_build(config_path: &Path, dockerfile: &Path, out: &dyn UserOutput) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = docker_client().await?;

    login_if_configured(&client, &config).await?;
    build_and_push(&client, &config, dockerfile).await?;

    out.success(&format!("Pushed {}", config.airflow_image_ref()));
    Ok(())
}
