use super::{docker_client, load_config};
use crate::output::UserOutput;
use airflow_run::docker::{ContainerRuntime, RunningInstance};
use airflow_run::service::InstanceRegistry;
use airflow_run::Error;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KillChoice {
    All,
    Cancel,
    Index(usize),
}

/// `a`, `c`, or an index below `count`.
pub(crate) fn parse_kill_choice(input: &str, count: usize) -> Option<KillChoice> {
    match input.trim() {
        "a" => Some(KillChoice::All),
        "c" => Some(KillChoice::Cancel),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|index| *index < count)
            .map(KillChoice::Index),
    }
}

pub async fn run_kill(config_path: &Path, out: &dyn UserOutput) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker_client().await?);
    let registry = InstanceRegistry::for_config(Arc::clone(&runtime), &config);

    let running = registry.running().await.map_err(Error::from)?;
    if running.is_empty() {
        out.status("No running service found.");
        return Ok(());
    }

    out.blank();
    out.status("Containers:");
    out.status("-----------");
    for (index, instance) in running.iter().enumerate() {
        out.status(&format!("{}. {}", index, instance.name));
    }
    out.status("a. Kill all.");
    out.status("c. Cancel.");

    let answer = out.prompt("Choose one: ")?;
    let victims: Vec<&RunningInstance> = match parse_kill_choice(&answer, running.len()) {
        Some(KillChoice::All) => running.iter().collect(),
        Some(KillChoice::Cancel) => return Ok(()),
        Some(KillChoice::Index(index)) => vec![&running[index]],
        None => anyhow::bail!("Invalid choice '{}'", answer),
    };

    for instance in victims {
        runtime.kill(&instance.name).await.map_err(Error::from)?;
        out.success(&format!("Killed {}", instance.name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_choices_parse() {
        assert_eq!(parse_kill_choice("a", 2), Some(KillChoice::All));
        assert_eq!(parse_kill_choice(" c\n", 2), Some(KillChoice::Cancel));
        assert_eq!(parse_kill_choice("1", 2), Some(KillChoice::Index(1)));
    }

    #[test]
    fn out_of_range_or_garbage_is_rejected() {
        assert_eq!(parse_kill_choice("2", 2), None);
        assert_eq!(parse_kill_choice("-1", 2), None);
        assert_eq!(parse_kill_choice("all", 2), None);
    }
}
