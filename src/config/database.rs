use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Upper bound on registered accessories (bridge limit)
    #[serde(default = "default_max_accessories")]
    pub max_accessories: usize,

    /// Poll cycle cadence of the binary
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_accessories: default_max_accessories(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_accessories == 0 {
            return Err(Error::Config(ConfigError::Message(
                "database.max_accessories must be greater than 0".into(),
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "database.poll_interval_ms must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_accessories() -> usize {
    150
}
fn default_poll_interval_ms() -> u64 {
    5
}
