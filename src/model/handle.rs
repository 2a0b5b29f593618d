use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::storage::write_through;
use crate::Change;
use crate::ChangeSink;
use crate::Characteristic;
use crate::PersistenceStore;
use crate::Result;
use crate::Value;

/// Device-side handle of a registered characteristic.
///
/// Cloneable and `Send`; device callbacks may set values from any thread while
/// the poll cycle runs.
#[derive(Clone)]
pub struct CharacteristicHandle {
    inner: Arc<Characteristic>,
    sink: ChangeSink,
    store: Arc<dyn PersistenceStore>,
}

impl CharacteristicHandle {
    pub(crate) fn new(
        inner: Arc<Characteristic>,
        sink: ChangeSink,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self { inner, sink, store }
    }

    /// Local set path.
    ///
    /// Out-of-range values are stored anyway and reported as a warning: a
    /// sensor must always be able to report what it measures. Only a value that
    /// cannot be represented in the characteristic's format is rejected.
    pub fn set_value(
        &self,
        value: impl Into<Value>,
        notify: bool,
    ) -> Result<()> {
        let c = &self.inner;
        let value = value.into().coerce(c.format())?;
        if !c.admits(&value) {
            warn!(
                aid = c.aid,
                iid = c.iid,
                name = %c.name,
                value = %value,
                "Value outside allowed range; stored anyway"
            );
        }
        if c.is_retired() {
            debug!(aid = c.aid, iid = c.iid, "Set on removed characteristic");
            c.store_local(value);
            return Ok(());
        }
        // The cell only changes once the durable copy has been written.
        if let Some(key) = c.durable_key() {
            write_through(self.store.as_ref(), key, &value)?;
        }
        c.store_local(value.clone());
        if notify {
            self.sink.publish(Change::new(c.clone(), value, None));
        }
        Ok(())
    }

    pub fn characteristic(&self) -> &Arc<Characteristic> {
        &self.inner
    }
}

impl Deref for CharacteristicHandle {
    type Target = Characteristic;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Debug for CharacteristicHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.inner.fmt(f)
    }
}
