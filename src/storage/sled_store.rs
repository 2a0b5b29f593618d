use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::PersistenceStore;
use crate::Result;
use crate::StorageConfig;

#[derive(Clone)]
pub struct SledPersistenceStore {
    db: Arc<sled::Db>,
    tree: Arc<sled::Tree>,
}

impl std::fmt::Debug for SledPersistenceStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledPersistenceStore")
            .field("tree_len", &self.tree.len())
            .finish()
    }
}

impl SledPersistenceStore {
    /// Opens (or creates) the database under `config.db_root_dir`.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let db = init_sled_value_db(
            &config.db_root_dir,
            config.cache_capacity,
            config.flush_every_ms,
        )?;
        Self::new(Arc::new(db), &config.tree_name)
    }

    pub fn new(
        db: Arc<sled::Db>,
        tree_name: &str,
    ) -> Result<Self> {
        let tree = db.open_tree(tree_name)?;
        debug!(tree_name, entries = tree.len(), "Opened value tree");
        Ok(SledPersistenceStore {
            db,
            tree: Arc::new(tree),
        })
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl PersistenceStore for SledPersistenceStore {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        match self.tree.get(key)? {
            Some(ivec) => Ok(Some(ivec.to_vec())),
            None => Ok(None),
        }
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn remove(
        &self,
        key: &str,
    ) -> Result<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let bytes = self.tree.flush()?;
        debug!(bytes, "Flushed value tree");
        Ok(())
    }
}

impl Drop for SledPersistenceStore {
    fn drop(&mut self) {
        // last clone closes the database
        if Arc::strong_count(&self.db) == 1 {
            if let Err(e) = self.db.flush() {
                warn!("Failed to flush sled DB on drop: {}", e);
            }
        }
    }
}

#[doc(hidden)]
pub fn init_sled_value_db(
    sled_db_root_path: impl AsRef<Path> + std::fmt::Debug,
    cache_capacity: u64,
    flush_every_ms: u64,
) -> Result<sled::Db> {
    debug!("init_sled_value_db from path: {:?}", &sled_db_root_path);

    let path = sled_db_root_path.as_ref().join("values");
    sled::Config::default()
        .path(&path)
        .cache_capacity(cache_capacity)
        .flush_every_ms(Some(flush_every_ms))
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                path, e
            );
            e.into()
        })
}
