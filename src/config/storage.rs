use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory of the sled database
    #[serde(default = "default_db_root_dir")]
    pub db_root_dir: PathBuf,

    /// Sled tree holding characteristic values
    #[serde(default = "default_tree_name")]
    pub tree_name: String,

    /// Sled page cache size in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Background flush interval of sled; every acknowledged write is flushed
    /// explicitly regardless
    #[serde(default = "default_flush_every_ms")]
    pub flush_every_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_root_dir: default_db_root_dir(),
            tree_name: default_tree_name(),
            cache_capacity: default_cache_capacity(),
            flush_every_ms: default_flush_every_ms(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Memory {
            return Ok(());
        }
        if self.db_root_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "storage.db_root_dir cannot be empty".into(),
            )));
        }
        if self.tree_name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "storage.tree_name cannot be empty".into(),
            )));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "storage.cache_capacity must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_db_root_dir() -> PathBuf {
    PathBuf::from("/tmp/hapdb")
}
fn default_tree_name() -> String {
    "characteristics".to_string()
}
fn default_cache_capacity() -> u64 {
    4 * 1024 * 1024
}
fn default_flush_every_ms() -> u64 {
    500
}
