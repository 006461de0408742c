// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("key \"{0}\" is not found in config")]
    #[diagnostic(
        code(afr::config::missing_key),
        help("Add the key to your config.yaml, or regenerate one with `afr --generate-config`")
    )]
    MissingKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown service '{0}'")]
    #[diagnostic(code(afr::service::unknown))]
    InvalidRole(String),

    #[error("{check} probe failed: {message}")]
    Probe { check: String, message: String },

    #[error("{check} did not become ready: {message}")]
    #[diagnostic(
        code(afr::readiness::exhausted),
        help("The dependency never answered within the retry budget. Re-running is safe: launches are idempotent by container name")
    )]
    RetryExhausted { check: String, message: String },

    #[error("Failed to launch '{service}': {message}")]
    #[diagnostic(code(afr::launch::failed))]
    Launch { service: String, message: String },

    #[error("Login to registry '{registry}' failed: {message}")]
    #[diagnostic(
        code(afr::registry::auth),
        help("Check registry-url, username and password in your config.yaml")
    )]
    RegistryAuth { registry: String, message: String },

    #[error("Docker error: {0}")]
    #[diagnostic(
        code(afr::docker::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Docker(#[from] DockerError),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::MissingKey(key) => Some(format!(
                "Add '{}' to your config.yaml. `afr --generate-config` writes a complete template.",
                key
            )),
            Error::InvalidRole(_) => Some(
                "Run `afr --run list` to see the supported services.".to_string()
            ),
            Error::RetryExhausted { check, .. } => Some(format!(
                "{} was unreachable. Check that it is running (`afr --list`) and that host/port/credentials in config.yaml are correct.",
                check
            )),
            Error::Launch { message, .. } if message.contains("already in use") => Some(
                "Another instance with this name or port is running. Inspect with `afr --list` or stop it with `afr --kill`.".to_string()
            ),
            Error::Launch { .. } => Some(
                "Check the image reference, published ports and volume paths in config.yaml.".to_string()
            ),
            Error::RegistryAuth { registry, .. } => Some(format!(
                "Verify the credentials with: docker login {}",
                registry
            )),
            Error::Docker(_) => Some(
                "Check that Docker is running: docker ps".to_string()
            ),
            Error::Build(msg) if msg.contains("private-registry-flag") => Some(
                "Set `private-registry-flag: true` and fill in registry-url, username and password.".to_string()
            ),
            Error::Config(_) | Error::Parse(_) | Error::Yaml(_) => Some(
                "Validate your config.yaml against `afr --generate-config` output".to_string()
            ),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
