use super::{docker_client, load_config};
use crate::output::UserOutput;
use airflow_run::docker::RunningInstance;
use airflow_run::service::InstanceRegistry;
use std::path::Path;
use std::sync::Arc;

pub async fn run_list(config_path: &Path, out: &dyn UserOutput) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = InstanceRegistry::for_config(Arc::new(docker_client().await?), &config);

    for instance in registry.running().await.map_err(airflow_run::Error::from)? {
        out.status(&format_instance(&instance));
    }
    Ok(())
}

pub(crate) fn format_instance(instance: &RunningInstance) -> String {
    format!("id: {} name: {}", instance.id, instance.name)
}
