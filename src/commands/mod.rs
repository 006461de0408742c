mod build;
mod generate;
mod kill;
mod list;
mod pull;
mod run;

pub use build::run_build;
pub use generate::run_generate_config;
pub use kill::run_kill;
pub use list::run_list;
pub use pull::run_pull;
pub use run::run_services;

use airflow_run::docker::{require_daemon, DockerClient};
use airflow_run::{Config, Error, Parser};
use std::path::Path;
use std::time::Duration;

/// How long `docker info` may take before the daemon is considered down.
const DAEMON_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Load and validate the config file.
pub(crate) fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "--config path to config file is invalid: {}",
            path.display()
        ))
        .into());
    }
    Ok(Parser::new().load_config(path)?)
}

/// Docker client, after checking the daemon answers.
pub(crate) async fn docker_client() -> anyhow::Result<DockerClient> {
    let client = DockerClient::new();
    require_daemon(&client, DAEMON_CHECK_TIMEOUT)
        .await
        .map_err(Error::from)?;
    Ok(client)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::output::UserOutput;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    /// Records printed lines and answers prompts from a script.
    #[derive(Default)]
    pub struct ScriptedOutput {
        pub lines: Mutex<Vec<String>>,
        answers: Mutex<VecDeque<String>>,
    }

    impl ScriptedOutput {
        pub fn with_answers(answers: &[&str]) -> Self {
            Self {
                lines: Mutex::new(Vec::new()),
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            }
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        fn push(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }

    impl UserOutput for ScriptedOutput {
        fn status(&self, message: &str) {
            self.push(message);
        }
        fn success(&self, message: &str) {
            self.push(message);
        }
        fn warning(&self, message: &str) {
            self.push(message);
        }
        fn blank(&self) {
            self.push("");
        }
        fn prompt(&self, message: &str) -> io::Result<String> {
            self.push(message);
            Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
        }
    }
}
