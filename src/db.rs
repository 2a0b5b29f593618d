//! The attribute database context.
//!
//! `AttributeDb` owns the tree, the durable store, the notification router and
//! the configuration hasher. Registration takes `&mut self`; once finalized, the
//! poll cycle shares it by reference while device code works through
//! [`CharacteristicHandle`]s from any thread.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::storage::open_store;
use crate::storage::write_through;
use crate::update::render_write_results;
use crate::AidRequest;
use crate::AttributeFilter;
use crate::AttributeTree;
use crate::CharSpec;
use crate::CharView;
use crate::Characteristic;
use crate::CharacteristicHandle;
use crate::CharacteristicsBody;
use crate::ConfigHasher;
use crate::ConfigReader;
use crate::ConfigRecord;
use crate::DbConfig;
use crate::Fields;
use crate::NotificationRouter;
use crate::ObserverId;
use crate::PersistenceStore;
use crate::Perms;
use crate::Result;
use crate::ServiceKey;
use crate::ServiceSpec;
use crate::StatusCode;
use crate::UpdateEngine;
use crate::Value;
use crate::WriteRequest;
use crate::WriteResult;

pub struct AttributeDb {
    config: DbConfig,
    tree: AttributeTree,
    store: Arc<dyn PersistenceStore>,
    router: NotificationRouter,
    hasher: ConfigHasher,
}

impl std::fmt::Debug for AttributeDb {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AttributeDb")
            .field("accessories", &self.tree.accessories().len())
            .field("characteristics", &self.tree.len())
            .field("finalized", &self.tree.is_finalized())
            .field("router", &self.router)
            .field("hasher", &self.hasher)
            .finish()
    }
}

impl AttributeDb {
    /// Builds a database over the store selected in `config`.
    pub fn open(config: DbConfig) -> Result<Self> {
        let store = open_store(&config)?;
        Self::new(config, store)
    }

    pub fn new(
        config: DbConfig,
        store: Arc<dyn PersistenceStore>,
    ) -> Result<Self> {
        let hasher = ConfigHasher::load(store.clone())?;
        let tree = AttributeTree::new(config.database.max_accessories);
        let router = NotificationRouter::new(&config.notification);
        info!(
            max_accessories = config.database.max_accessories,
            config_version = hasher.current().version,
            "Attribute database created"
        );
        Ok(Self {
            config,
            tree,
            store,
            router,
            hasher,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn tree(&self) -> &AttributeTree {
        &self.tree
    }

    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    pub fn add_accessory(
        &mut self,
        request: AidRequest,
    ) -> Result<u32> {
        self.tree.add_accessory(request)
    }

    pub fn add_service(
        &mut self,
        aid: u32,
        spec: ServiceSpec,
    ) -> Result<ServiceKey> {
        self.tree.add_service(aid, spec)
    }

    /// Registers a characteristic. A durable characteristic takes its stored
    /// value; without one, its initial value is written through.
    pub fn add_characteristic(
        &mut self,
        service: ServiceKey,
        spec: CharSpec,
    ) -> Result<CharacteristicHandle> {
        let characteristic = self.tree.add_characteristic(service, spec)?;
        if let Some(key) = characteristic.durable_key() {
            self.restore(&characteristic, key)?;
        }
        Ok(self.handle(characteristic))
    }

    pub fn link_services(
        &mut self,
        from: ServiceKey,
        to: ServiceKey,
    ) -> Result<()> {
        self.tree.link_services(from, to)
    }

    pub fn reset_instance_ids(
        &mut self,
        aid: u32,
        start: u32,
    ) -> Result<()> {
        self.tree.reset_instance_ids(aid, start)
    }

    /// Removes an accessory and erases its durable values. Returns `false` when
    /// the id is not registered.
    pub fn remove_accessory(
        &mut self,
        aid: u32,
    ) -> Result<bool> {
        let Some(removed) = self.tree.remove_accessory(aid)? else {
            debug!(aid, "remove_accessory: not found");
            return Ok(false);
        };

        if self.tree.is_finalized() {
            self.hasher.update(ConfigHasher::digest(&self.tree)?)?;
        }

        // The accessory is already gone; leftover durable keys are only logged.
        let mut erased = 0;
        for key in removed.iter().filter_map(|c| c.durable_key()) {
            match self.store.remove(key) {
                Ok(()) => erased += 1,
                Err(e) => error!(aid, key, "Failed to erase durable value: {}", e),
            }
        }
        if erased > 0 {
            match self.store.commit() {
                Ok(()) => debug!(aid, erased, "Durable values erased"),
                Err(e) => error!(aid, erased, "Failed to commit durable erase: {}", e),
            }
        }
        Ok(true)
    }

    /// Validates the tree and refreshes the configuration version. May be
    /// called again after structural changes.
    pub fn finalize(&mut self) -> Result<ConfigRecord> {
        self.tree.validate()?;
        let changed = self.hasher.update(ConfigHasher::digest(&self.tree)?)?;
        self.tree.mark_finalized();

        let record = self.hasher.current();
        info!(
            accessories = self.tree.accessories().len(),
            characteristics = self.tree.len(),
            version = record.version,
            changed,
            "Attribute database finalized"
        );
        Ok(record)
    }

    fn restore(
        &self,
        characteristic: &Characteristic,
        key: &str,
    ) -> Result<()> {
        let stored = match self.store.get(key)? {
            Some(raw) => match Value::from_raw(characteristic.format(), &raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, "Stored value is corrupt, rewriting default: {}", e);
                    None
                }
            },
            None => None,
        };

        match stored {
            Some(value) => {
                if !characteristic.admits(&value) {
                    warn!(key, value = %value, "Stored value outside allowed range");
                }
                debug!(key, value = %value, "Restored durable value");
                characteristic.store_local(value);
            }
            None => write_through(self.store.as_ref(), key, &characteristic.get_value())?,
        }
        Ok(())
    }

    fn handle(
        &self,
        characteristic: Arc<Characteristic>,
    ) -> CharacteristicHandle {
        CharacteristicHandle::new(characteristic, self.router.sink(), self.store.clone())
    }

    pub fn find(
        &self,
        aid: u32,
        iid: u32,
    ) -> Option<CharacteristicHandle> {
        self.tree.find(aid, iid).map(|c| self.handle(c.clone()))
    }

    /// Applies a remote write batch on behalf of `origin`.
    pub fn apply_batch(
        &self,
        batch: &[WriteRequest],
        origin: Option<ObserverId>,
    ) -> Vec<WriteResult> {
        UpdateEngine::new(&self.tree, &self.router, self.store.as_ref()).apply(batch, origin)
    }

    pub fn serialize_attributes(
        &self,
        filter: &AttributeFilter,
    ) -> Result<Vec<u8>> {
        self.tree.serialize(filter)
    }

    /// Renders a multi-item read. When any item fails, or `fields` asks for
    /// it, every item carries a status.
    pub fn read_characteristics(
        &self,
        ids: &[(u32, u32)],
        fields: Fields,
        observer: Option<ObserverId>,
    ) -> Result<Vec<u8>> {
        let fields = fields | Fields::AID;
        let mut failed = false;
        let mut characteristics: Vec<CharView> = ids
            .iter()
            .map(|&(aid, iid)| match self.tree.find(aid, iid) {
                None => {
                    failed = true;
                    CharView::status_only(aid, iid, StatusCode::UnknownResource)
                }
                Some(c) if !c.perms().contains(Perms::PAIRED_READ) => {
                    failed = true;
                    CharView::status_only(aid, iid, StatusCode::WriteOnly)
                }
                Some(c) => CharView::render(c, fields, observer),
            })
            .collect();

        if failed || fields.contains(Fields::STATUS) {
            for view in characteristics.iter_mut().filter(|v| v.status.is_none()) {
                view.status = Some(StatusCode::Ok.code());
            }
        }
        Ok(serde_json::to_vec(&CharacteristicsBody { characteristics })?)
    }

    pub fn serialize_write_results(
        &self,
        results: &[WriteResult],
    ) -> Result<Vec<u8>> {
        render_write_results(results)
    }

    pub fn open_observer(&self) -> Result<ObserverId> {
        self.router.open_observer()
    }

    pub fn subscribe(
        &self,
        aid: u32,
        iid: u32,
        observer: ObserverId,
    ) -> StatusCode {
        match self.tree.find(aid, iid) {
            None => StatusCode::UnknownResource,
            Some(c) if !c.perms().contains(Perms::EVENTS) => StatusCode::NotificationNotSupported,
            Some(_) if !self.router.is_open(observer) => StatusCode::UnableToPerform,
            Some(c) => {
                self.router.subscribe(c, observer);
                StatusCode::Ok
            }
        }
    }

    pub fn unsubscribe(
        &self,
        aid: u32,
        iid: u32,
        observer: ObserverId,
    ) -> StatusCode {
        match self.tree.find(aid, iid) {
            None => StatusCode::UnknownResource,
            Some(c) => {
                self.router.unsubscribe(c, observer);
                StatusCode::Ok
            }
        }
    }

    /// Drops every subscription of `observer` and closes it. Returns the number
    /// of subscriptions removed.
    pub fn unsubscribe_all(
        &self,
        observer: ObserverId,
    ) -> usize {
        let removed = self
            .tree
            .characteristics()
            .filter(|c| self.router.unsubscribe(c, observer))
            .count();
        self.router.close_observer(observer);
        debug!(%observer, removed, "Observer unsubscribed from all characteristics");
        removed
    }

    pub fn drain_notifications(&self) -> BTreeMap<ObserverId, Vec<u8>> {
        self.router.drain()
    }

    /// One poll cycle: run service poll hooks, drain notifications, then
    /// clear this cycle's write markers.
    pub fn poll(&self) -> BTreeMap<ObserverId, Vec<u8>> {
        let hooks = self.tree.services().filter(|s| s.run_poll()).count();
        if hooks > 0 {
            trace!(hooks, "Poll hooks ran");
        }
        let payloads = self.router.drain();
        for c in self.tree.characteristics() {
            c.clear_update_flag();
        }
        payloads
    }

    pub fn config_record(&self) -> ConfigRecord {
        self.hasher.current()
    }

    pub fn config_reader(&self) -> ConfigReader {
        self.hasher.reader()
    }
}
