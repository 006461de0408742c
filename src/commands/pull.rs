use super::{docker_client, load_config};
use crate::output::UserOutput;
use airflow_run::docker::{login_if_configured, pull_airflow_image};
use std::path::Path;

pub async fn run_pull(config_path: &Path, out: &dyn UserOutput) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = docker_client().await?;

    login_if_configured(&client, &config).await?;
    pull_airflow_image(&client, &config).await?;

    out.success(&format!("Pulled {}", config.airflow_image_ref()));
    Ok(())
}
