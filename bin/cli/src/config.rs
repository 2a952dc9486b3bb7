//! CLI configuration.
//!
//! Loaded via the `config` crate from an optional TOML file, overridden by
//! environment variables such as `QUIRE__DATABASE__URL` or
//! `QUIRE__STORE__USER_TABLE`.

use std::path::Path;

use quire_store::{DatabaseConfig, StoreConfig};
use serde::Deserialize;

/// Configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct CliConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Table and column bindings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl CliConfig {
    /// Loads configuration from `file` (if given) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if required
    /// configuration is missing or invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("QUIRE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
