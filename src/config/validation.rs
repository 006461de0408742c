use super::Config;
use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};

/// Keys every config document must carry, checked in this order.
pub const REQUIRED_KEYS: &[&str] = &[
    "environment-overrides",
    "private-registry-flag",
    "registry-url",
    "repository",
    "image",
    "tag",
    "username",
    "password",
    "local-dir",
    "webserver-port",
    "flower-port",
    "rabbitmq",
    "postgresql",
];

/// Keys required inside `rabbitmq`.
pub const REQUIRED_BROKER_KEYS: &[&str] = &[
    "name",
    "username",
    "password",
    "host",
    "virtual-host",
    "image",
    "home",
    "ui-port",
    "port",
    "env",
];

/// Keys required inside `postgresql`.
pub const REQUIRED_DATABASE_KEYS: &[&str] = &[
    "name", "username", "password", "host", "image", "data", "port", "env",
];

/// Keys required in every `custom-mount-volumes` entry.
pub const REQUIRED_MOUNT_KEYS: &[&str] = &["host-path", "container-path"];

/// Check the raw document for required keys before it is deserialized.
///
/// Top-level keys are checked before nested ones, and nested sections in
/// declaration order (`rabbitmq`, then `postgresql`), so the first missing
/// key reported is always the same for the same document. Nested keys are
/// reported as dotted paths (`postgresql.port`).
pub fn validate_required_keys(doc: &Value) -> Result<()> {
    let root = doc
        .as_mapping()
        .ok_or_else(|| Error::Config("config document must be a mapping".to_string()))?;

    for key in REQUIRED_KEYS {
        if !has_key(root, key) {
            return Err(Error::MissingKey((*key).to_string()));
        }
    }

    for (section, keys) in [
        ("rabbitmq", REQUIRED_BROKER_KEYS),
        ("postgresql", REQUIRED_DATABASE_KEYS),
    ] {
        let nested = section_mapping(root, section)?;
        for key in keys {
            if !has_key(nested, key) {
                return Err(Error::MissingKey(format!("{}.{}", section, key)));
            }
        }
    }

    if let Some(mounts) = root.get("custom-mount-volumes") {
        validate_custom_mounts(mounts)?;
    }

    Ok(())
}

fn validate_custom_mounts(mounts: &Value) -> Result<()> {
    let entries = match mounts {
        Value::Null => return Ok(()),
        Value::Sequence(entries) => entries,
        _ => {
            return Err(Error::Config(
                "'custom-mount-volumes' must be a list".to_string(),
            ))
        }
    };

    for (index, entry) in entries.iter().enumerate() {
        let entry = entry.as_mapping().ok_or_else(|| {
            Error::Config(format!("custom-mount-volumes[{}] must be a mapping", index))
        })?;
        for key in REQUIRED_MOUNT_KEYS {
            if !has_key(entry, key) {
                return Err(Error::MissingKey(format!(
                    "custom-mount-volumes[{}].{}",
                    index, key
                )));
            }
        }
    }
    Ok(())
}

fn has_key(mapping: &Mapping, key: &str) -> bool {
    mapping.contains_key(Value::String(key.to_string()))
}

fn section_mapping<'a>(root: &'a Mapping, section: &str) -> Result<&'a Mapping> {
    root.get(section)
        .and_then(Value::as_mapping)
        .ok_or_else(|| Error::Config(format!("'{}' must be a mapping", section)))
}

impl Config {
    /// Semantic checks on an already deserialized config.
    pub fn validate(&self) -> Result<()> {
        if self.local_dir.trim().is_empty() {
            return Err(Error::Config("'local-dir' must not be empty".to_string()));
        }

        for (field, port) in [
            ("webserver-port", self.webserver_port),
            ("flower-port", self.flower_port),
            ("rabbitmq.port", self.rabbitmq.port),
            ("rabbitmq.ui-port", self.rabbitmq.ui_port),
            ("postgresql.port", self.postgresql.port),
        ] {
            if port == 0 {
                return Err(Error::Config(format!("'{}' must be a non-zero port", field)));
            }
        }

        if self.webserver_port == self.flower_port {
            return Err(Error::Config(format!(
                "'webserver-port' and 'flower-port' are both {}",
                self.webserver_port
            )));
        }

        for mount in &self.custom_mount_volumes {
            if mount.container_path.is_empty() || mount.host_path.is_empty() {
                return Err(Error::Config(
                    "custom mount paths must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
