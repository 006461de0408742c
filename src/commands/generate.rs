use crate::output::UserOutput;
use airflow_run::config::{render_template, GeneratedConfigAnswers};
use std::path::Path;

/// Prompt for the deployment-specific values and write `config.yaml` into `dir`.
pub fn run_generate_config(dir: &Path, out: &dyn UserOutput) -> anyhow::Result<()> {
    let answers = GeneratedConfigAnswers {
        local_dir: out.prompt("Please enter local path which contains /dags and /logs: ")?,
        rabbitmq_host: out.prompt("Please enter rabbitmq host/ip: ")?,
        rabbitmq_username: out.prompt("Please enter rabbitmq username: ")?,
        rabbitmq_password: out.prompt("Please enter rabbitmq password: ")?,
        postgresql_host: out.prompt("Please enter postgresql host/ip: ")?,
        postgresql_username: out.prompt("Please enter postgresql username: ")?,
        postgresql_password: out.prompt("Please enter postgresql password: ")?,
    };

    let content = render_template(&answers)?;
    let path = dir.join("config.yaml");
    std::fs::write(&path, content)?;

    let shown = std::fs::canonicalize(&path).unwrap_or(path);
    out.success(&format!("Created file: {}", shown.display()));
    Ok(())
}
