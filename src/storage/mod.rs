//! Durable key/value mapping for characteristic values.
//!
//! Keys are derived with [`crate::convert::durable_key`]. Every acknowledged
//! change is written and committed before control returns to the writer.

mod mem_store;
mod sled_store;
pub use mem_store::*;
pub use sled_store::*;


use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::DbConfig;
use crate::Result;
use crate::StorageBackend;
use crate::Value;

#[cfg_attr(test, automock)]
pub trait PersistenceStore: Send + Sync + 'static {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>>;

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()>;

    fn remove(
        &self,
        key: &str,
    ) -> Result<()>;

    /// Makes every previous `set`/`remove` durable. A write is acknowledged only
    /// after this returns.
    fn commit(&self) -> Result<()>;
}

/// Stores one value and commits it.
pub fn write_through(
    store: &dyn PersistenceStore,
    key: &str,
    value: &Value,
) -> Result<()> {
    store.set(key, value.to_raw())?;
    store.commit()?;
    debug!(key, value = %value, "Durable value committed");
    Ok(())
}

/// Opens the store selected by `config.storage.backend`.
pub fn open_store(config: &DbConfig) -> Result<Arc<dyn PersistenceStore>> {
    let store: Arc<dyn PersistenceStore> = match config.storage.backend {
        StorageBackend::Sled => Arc::new(SledPersistenceStore::open(&config.storage)?),
        StorageBackend::Memory => Arc::new(MemoryPersistenceStore::new()),
    };
    Ok(store)
}
