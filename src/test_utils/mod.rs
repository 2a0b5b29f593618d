//! Helpers shared by the unit tests.

use std::sync::Arc;

use crate::chr;
use crate::svc;
use crate::AidRequest;
use crate::AttributeDb;
use crate::CharSpec;
use crate::CharacteristicHandle;
use crate::DbConfig;
use crate::MemoryPersistenceStore;
use crate::PersistenceStore;
use crate::ServiceKey;
use crate::ServiceSpec;
use crate::StorageBackend;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

pub fn memory_config() -> DbConfig {
    let mut config = DbConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config
}

pub fn memory_db(store: Arc<MemoryPersistenceStore>) -> AttributeDb {
    enable_logger();
    let store: Arc<dyn PersistenceStore> = store;
    AttributeDb::new(memory_config(), store).expect("memory db")
}

/// Registers `aid` with an information service carrying Identify and Name.
pub fn add_bridged_accessory(
    db: &mut AttributeDb,
    aid: u32,
) -> ServiceKey {
    let aid = db.add_accessory(AidRequest::Exact(aid)).expect("accessory");
    let info = db
        .add_service(aid, ServiceSpec::of(svc::ACCESSORY_INFORMATION).expect("catalog"))
        .expect("service");
    db.add_characteristic(info, CharSpec::of(chr::IDENTIFY).expect("catalog"))
        .expect("identify");
    db.add_characteristic(info, CharSpec::of(chr::NAME).expect("catalog"))
        .expect("name");
    info
}

/// Light bulb accessory: information (1) identify (2) name (3),
/// light bulb (4) durable on (5) brightness (6).
pub struct LightFixture {
    pub db: AttributeDb,
    pub store: Arc<MemoryPersistenceStore>,
    pub light: ServiceKey,
    pub on: CharacteristicHandle,
    pub brightness: CharacteristicHandle,
}

pub fn light_fixture(store: Arc<MemoryPersistenceStore>) -> LightFixture {
    let mut db = memory_db(store.clone());
    add_bridged_accessory(&mut db, 1);
    let light = db
        .add_service(1, ServiceSpec::of(svc::LIGHT_BULB).expect("catalog").primary())
        .expect("service");
    let on = db
        .add_characteristic(light, CharSpec::of(chr::ON).expect("catalog").durable())
        .expect("on");
    let brightness = db
        .add_characteristic(light, CharSpec::of(chr::BRIGHTNESS).expect("catalog"))
        .expect("brightness");
    LightFixture {
        db,
        store,
        light,
        on,
        brightness,
    }
}
