use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use tracing::trace;

use super::PersistenceStore;
use crate::Result;

/// Volatile store; values live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPersistenceStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
    commits: AtomicU64,
}

impl MemoryPersistenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `commit` calls so far
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.data.read().contains_key(key)
    }
}

impl PersistenceStore for MemoryPersistenceStore {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        trace!(key, len = value.len(), "set");
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(
        &self,
        key: &str,
    ) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
