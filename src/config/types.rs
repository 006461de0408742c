//! Core configuration types.
//!
//! This module contains the root [`Config`] struct and the broker/database
//! sub-configs of the `config.yaml` document. Keys are kebab-case.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure for config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Environment variables passed verbatim to every Airflow container.
    /// Explicit entries take precedence over derived connection strings.
    #[serde(default, deserialize_with = "string_map")]
    pub environment_overrides: BTreeMap<String, String>,

    pub private_registry_flag: bool,

    #[serde(deserialize_with = "scalar_string")]
    pub registry_url: String,

    #[serde(deserialize_with = "scalar_string")]
    pub repository: String,

    #[serde(deserialize_with = "scalar_string")]
    pub image: String,

    #[serde(deserialize_with = "scalar_string")]
    pub tag: String,

    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub password: Option<String>,

    /// Host directory holding `dags/`, `logs/` and the database data directory.
    #[serde(deserialize_with = "scalar_string")]
    pub local_dir: String,

    pub webserver_port: u16,

    pub flower_port: u16,

    pub rabbitmq: BrokerConfig,

    pub postgresql: DatabaseConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_mount_volumes: Vec<CustomMount>,
}

/// Message broker (RabbitMQ) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrokerConfig {
    /// Container name, also used for the idempotent "already running" check.
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub username: String,
    #[serde(deserialize_with = "scalar_string")]
    pub password: String,
    #[serde(deserialize_with = "scalar_string")]
    pub host: String,
    #[serde(deserialize_with = "scalar_string")]
    pub virtual_host: String,
    #[serde(deserialize_with = "scalar_string")]
    pub image: String,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub tag: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub home: String,
    pub ui_port: u16,
    pub port: u16,
    #[serde(default, deserialize_with = "string_map")]
    pub env: BTreeMap<String, String>,
}

/// Metadata database (PostgreSQL) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub username: String,
    #[serde(deserialize_with = "scalar_string")]
    pub password: String,
    #[serde(deserialize_with = "scalar_string")]
    pub host: String,
    #[serde(deserialize_with = "scalar_string")]
    pub image: String,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub tag: Option<String>,
    /// Data directory inside the container.
    #[serde(deserialize_with = "scalar_string")]
    pub data: String,
    pub port: u16,
    #[serde(default, deserialize_with = "string_map")]
    pub env: BTreeMap<String, String>,
}

/// A user-specified bind mount for the Airflow containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CustomMount {
    pub host_path: String,
    pub container_path: String,
}

impl Config {
    /// `registry-url/repository`, the name images are pushed to and pulled from.
    pub fn airflow_repository(&self) -> String {
        format!("{}/{}", self.registry_url, self.repository)
    }

    /// Full Airflow image reference: `registry-url/repository:tag`.
    pub fn airflow_image_ref(&self) -> String {
        format!("{}:{}", self.airflow_repository(), self.tag)
    }

    /// Registry credentials, only when the private-registry flag is set and
    /// both username and password are non-empty.
    pub fn registry_credentials(&self) -> Option<(&str, &str)> {
        if !self.private_registry_flag {
            return None;
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl BrokerConfig {
    pub fn image_ref(&self) -> String {
        image_with_tag(&self.image, self.tag.as_deref())
    }
}

impl DatabaseConfig {
    pub fn image_ref(&self) -> String {
        image_with_tag(&self.image, self.tag.as_deref())
    }
}

fn image_with_tag(image: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => format!("{}:{}", image, tag),
        _ => image.to_string(),
    }
}

/// Render a YAML scalar as the string a shell would see.
fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => {
            if n.is_f64() {
                // `tag: 1.10` arrives as the float 1.1.
                tracing::warn!(
                    "Unquoted decimal value {} was read as a number; quote it to keep trailing zeros",
                    n
                );
            }
            Some(n.to_string())
        }
        serde_yaml::Value::String(s) => Some(s),
        _ => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    scalar_to_string(value).ok_or_else(|| de::Error::custom("expected a scalar value"))
}

fn optional_scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    scalar_to_string(value)
        .map(Some)
        .ok_or_else(|| de::Error::custom("expected a scalar value"))
}

fn string_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;
    let mut map = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        let value = scalar_to_string(value)
            .ok_or_else(|| de::Error::custom(format!("value of '{}' must be a scalar", key)))?;
        map.insert(key, value);
    }
    Ok(map)
}
