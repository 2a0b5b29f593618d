use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Capacity of the change queue between writers and the poll cycle.
    /// 0 means unbounded; when bounded, changes past capacity are dropped.
    #[serde(default)]
    pub change_queue_size: usize,

    /// Maximum number of concurrently open observers
    #[serde(default = "default_max_observers")]
    pub max_observers: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            change_queue_size: 0,
            max_observers: default_max_observers(),
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_observers == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notification.max_observers must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_observers() -> usize {
    16
}
