//! Configuration management for the attribute database.
//!
//! Sources are merged with increasing priority:
//! 1. Type defaults
//! 2. The file named by `CONFIG_PATH` (if set)
//! 3. Environment variables with the `HAPDB__` prefix

mod database;
mod notify;
mod storage;
pub use database::*;
pub use notify::*;
pub use storage::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct DbConfig {
    /// Durable value store
    #[serde(default)]
    pub storage: StorageConfig,
    /// Change queue and observer limits
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Tree capacity and poll cadence
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Debug for DbConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("storage", &self.storage)
            .field("database", &self.database)
            .finish()
    }
}

impl DbConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers must call [`DbConfig::validate`] once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("HAPDB__DATABASE__MAX_ACCESSORIES", "40");
    /// let cfg = DbConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("HAPDB")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers another configuration file over the current values.
    ///
    /// Environment variables still take precedence over the file.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("HAPDB")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.storage.validate()?;
        self.notification.validate()?;
        self.database.validate()?;
        Ok(self)
    }
}
