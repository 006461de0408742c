use super::{validate_required_keys, Config};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config location when neither `--config` nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// Environment variable consulted for the config path.
pub const CONFIG_PATH_ENV: &str = "AIRFLOWRUN_CONFIG_PATH";

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Resolve which config file to use: explicit path, then
    /// `AIRFLOWRUN_CONFIG_PATH`, then `./config.yaml`.
    pub fn config_path(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Load config from file path
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        self.parse_config(&content)
    }

    /// Parse config from YAML string.
    ///
    /// Required keys are checked on the raw document first so a missing key
    /// surfaces as [`Error::MissingKey`] rather than a serde message.
    pub fn parse_config(&self, content: &str) -> Result<Config> {
        let doc: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse YAML config: {}", e)))?;

        Self::config_from_value(doc)
    }

    /// Validate and deserialize an already parsed document.
    pub fn config_from_value(doc: serde_yaml::Value) -> Result<Config> {
        validate_required_keys(&doc)?;

        let config: Config = serde_yaml::from_value(doc)
            .map_err(|e| Error::Config(format!("Invalid config value: {}", e)))?;
        config.validate()?;

        Ok(config)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
