//! Configuration parsing and types.
//!
//! This module provides the configuration system for airflow-run,
//! organized into focused submodules:
//!
//! - `types` - Core config structure (`Config`, `BrokerConfig`, `DatabaseConfig`)
//! - `parser` - YAML config loading and config path discovery
//! - `validation` - Required-key and semantic checks
//! - `resolve` - Effective container environment (`ResolvedConfig`)
//! - `template` - Starter `config.yaml` generation

mod parser;
mod resolve;
mod template;
mod types;
mod validation;

pub use parser::*;
pub use resolve::*;
pub use template::*;
pub use types::*;
pub use validation::*;
