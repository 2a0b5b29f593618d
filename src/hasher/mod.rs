//! Structural digest of the attribute tree and the configuration version
//! derived from it.
//!
//! The digest covers type ids, instance ids, formats and permissions only.
//! Values never reach it, so value traffic cannot bump the version.


use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha384;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::constants::CONFIG_RECORD_KEY;
use crate::constants::MAX_CONFIG_VERSION;
use crate::AttributeFilter;
use crate::AttributeTree;
use crate::PersistenceStore;
use crate::Result;

/// Persisted `{version, hash}` pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// 0 until the first finalize
    pub version: u16,
    pub hash: Vec<u8>,
}

impl ConfigRecord {
    /// Version following `self`; wraps to 1 and never returns to 0.
    fn next_version(&self) -> u16 {
        if self.version >= MAX_CONFIG_VERSION {
            1
        } else {
            self.version + 1
        }
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

/// Lock-free view of the current record for other threads
#[derive(Debug, Clone)]
pub struct ConfigReader {
    record: Arc<ArcSwap<ConfigRecord>>,
}

impl ConfigReader {
    pub fn version(&self) -> u16 {
        self.record.load().version
    }

    pub fn hash_hex(&self) -> String {
        self.record.load().hash_hex()
    }

    pub fn record(&self) -> ConfigRecord {
        ConfigRecord::clone(&self.record.load())
    }
}

pub struct ConfigHasher {
    store: Arc<dyn PersistenceStore>,
    record: Arc<ArcSwap<ConfigRecord>>,
}

impl std::fmt::Debug for ConfigHasher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigHasher")
            .field("record", &self.current())
            .finish()
    }
}

impl ConfigHasher {
    /// Reloads the stored record. A record that fails to decode is treated as
    /// absent.
    pub fn load(store: Arc<dyn PersistenceStore>) -> Result<Self> {
        let record = match store.get(CONFIG_RECORD_KEY)? {
            Some(bytes) => match bincode::deserialize::<ConfigRecord>(&bytes) {
                Ok(record) => {
                    debug!(version = record.version, hash = %record.hash_hex(), "Loaded config record");
                    record
                }
                Err(e) => {
                    warn!(key = CONFIG_RECORD_KEY, "Config record is corrupt, starting over: {}", e);
                    ConfigRecord::default()
                }
            },
            None => ConfigRecord::default(),
        };
        Ok(Self {
            store,
            record: Arc::new(ArcSwap::from_pointee(record)),
        })
    }

    /// SHA-384 over the value-free rendering of the tree.
    pub fn digest(tree: &AttributeTree) -> Result<Vec<u8>> {
        let structure = tree.serialize(&AttributeFilter::structure())?;
        Ok(Sha384::digest(&structure).to_vec())
    }

    /// Adopts `digest`. Bumps and persists the version only when it differs
    /// from the stored hash; returns whether it did.
    pub fn update(
        &self,
        digest: Vec<u8>,
    ) -> Result<bool> {
        let current = self.record.load();
        if current.hash == digest {
            debug!(version = current.version, "Configuration unchanged");
            return Ok(false);
        }

        let next = ConfigRecord {
            version: current.next_version(),
            hash: digest,
        };
        self.store
            .set(CONFIG_RECORD_KEY, bincode::serialize(&next)?)?;
        self.store.commit()?;
        info!(
            version = next.version,
            hash = %next.hash_hex(),
            "Configuration version updated"
        );
        self.record.store(Arc::new(next));
        Ok(true)
    }

    pub fn current(&self) -> ConfigRecord {
        ConfigRecord::clone(&self.record.load())
    }

    pub fn reader(&self) -> ConfigReader {
        ConfigReader {
            record: self.record.clone(),
        }
    }
}
