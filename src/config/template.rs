//! Starter `config.yaml` generation.

use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::RngCore;
use serde_yaml::{Mapping, Value};

/// Environment key holding the Fernet key Airflow encrypts connections with.
pub const FERNET_KEY_ENV: &str = "AIRFLOW__CORE__FERNET_KEY";

/// Built-in template. Answers from the operator are written over it.
pub const CONFIG_TEMPLATE: &str = r#"environment-overrides:
  AIRFLOW__CORE__EXECUTOR: CeleryExecutor
  AIRFLOW__CORE__LOAD_EXAMPLES: "False"
  AIRFLOW__CORE__FERNET_KEY: ""
private-registry-flag: false
registry-url: docker.io
repository: puckel/docker-airflow
image: puckel/docker-airflow
tag: "1.10.9"
username:
password:
local-dir: ""
webserver-port: 8080
flower-port: 5555
rabbitmq:
  name: rabbitmq
  username: ""
  password: ""
  host: ""
  virtual-host: /
  image: rabbitmq:3-management
  home: /var/lib/rabbitmq
  ui-port: 15672
  port: 5672
  env:
    RABBITMQ_DEFAULT_USER: ""
    RABBITMQ_DEFAULT_PASS: ""
postgresql:
  name: postgresql
  username: ""
  password: ""
  host: ""
  image: postgres
  tag: "12"
  data: /var/lib/postgresql/data
  port: 5432
  env:
    POSTGRES_USER: ""
    POSTGRES_PASSWORD: ""
"#;

/// Operator answers collected by `--generate-config`.
#[derive(Debug, Clone, Default)]
pub struct GeneratedConfigAnswers {
    pub local_dir: String,
    pub rabbitmq_host: String,
    pub rabbitmq_username: String,
    pub rabbitmq_password: String,
    pub postgresql_host: String,
    pub postgresql_username: String,
    pub postgresql_password: String,
}

/// 32 random bytes, URL-safe base64 encoded.
pub fn generate_fernet_key() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    URL_SAFE.encode(key)
}

/// Fill the template with `answers` and a fresh Fernet key.
pub fn render_template(answers: &GeneratedConfigAnswers) -> Result<String> {
    render_template_with_key(answers, &generate_fernet_key())
}

pub fn render_template_with_key(answers: &GeneratedConfigAnswers, fernet_key: &str) -> Result<String> {
    let mut doc: Value = serde_yaml::from_str(CONFIG_TEMPLATE)?;
    let root = as_mapping_mut(&mut doc, "root")?;

    set(section(root, "environment-overrides")?, FERNET_KEY_ENV, fernet_key);
    set(root, "local-dir", &answers.local_dir);

    let mq = section(root, "rabbitmq")?;
    set(mq, "host", &answers.rabbitmq_host);
    set(mq, "username", &answers.rabbitmq_username);
    set(mq, "password", &answers.rabbitmq_password);
    let mq_env = section(mq, "env")?;
    set(mq_env, "RABBITMQ_DEFAULT_USER", &answers.rabbitmq_username);
    set(mq_env, "RABBITMQ_DEFAULT_PASS", &answers.rabbitmq_password);

    let db = section(root, "postgresql")?;
    set(db, "host", &answers.postgresql_host);
    set(db, "username", &answers.postgresql_username);
    set(db, "password", &answers.postgresql_password);
    let db_env = section(db, "env")?;
    set(db_env, "POSTGRES_USER", &answers.postgresql_username);
    set(db_env, "POSTGRES_PASSWORD", &answers.postgresql_password);

    Ok(serde_yaml::to_string(&doc)?)
}

fn as_mapping_mut<'a>(value: &'a mut Value, name: &str) -> Result<&'a mut Mapping> {
    value
        .as_mapping_mut()
        .ok_or_else(|| Error::Config(format!("template section '{}' is not a mapping", name)))
}

fn section<'a>(mapping: &'a mut Mapping, key: &str) -> Result<&'a mut Mapping> {
    let value = mapping
        .get_mut(key)
        .ok_or_else(|| Error::MissingKey(key.to_string()))?;
    as_mapping_mut(value, key)
}

fn set(mapping: &mut Mapping, key: &str, value: &str) {
    mapping.insert(Value::String(key.to_string()), Value::String(value.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parser;

    fn answers() -> GeneratedConfigAnswers {
        GeneratedConfigAnswers {
            local_dir: "/opt/airflow".to_string(),
            rabbitmq_host: "mq1".to_string(),
            rabbitmq_username: "rabbit".to_string(),
            rabbitmq_password: "carrot".to_string(),
            postgresql_host: "db1".to_string(),
            postgresql_username: "airflow".to_string(),
            postgresql_password: "s3cret".to_string(),
        }
    }

    #[test]
    fn fernet_key_is_32_bytes_url_safe() {
        let key = generate_fernet_key();
        let decoded = URL_SAFE.decode(&key).unwrap();
        assert_eq!(decoded.len(), 32);
        assert!(!key.contains('+') && !key.contains('/'));
        assert_ne!(key, generate_fernet_key());
    }

    #[test]
    fn rendered_template_is_a_valid_config() {
        let yaml = render_template_with_key(&answers(), "k3y").unwrap();
        let config = Parser::new().parse_config(&yaml).unwrap();

        assert_eq!(config.local_dir, "/opt/airflow");
        assert_eq!(config.rabbitmq.host, "mq1");
        assert_eq!(config.rabbitmq.env["RABBITMQ_DEFAULT_PASS"], "carrot");
        assert_eq!(config.postgresql.env["POSTGRES_USER"], "airflow");
        assert_eq!(config.environment_overrides[FERNET_KEY_ENV], "k3y");
        assert_eq!(config.tag, "1.10.9");
    }
}
