use std::path::Path;

use hapdb::chr;
use hapdb::svc;
use hapdb::AidRequest;
use hapdb::AttributeDb;
use hapdb::CharSpec;
use hapdb::CharacteristicHandle;
use hapdb::DbConfig;
use hapdb::Result;
use hapdb::ServiceSpec;
use hapdb::StorageBackend;

pub fn sled_config(dir: &Path) -> DbConfig {
    let mut config = DbConfig::default();
    config.storage.backend = StorageBackend::Sled;
    config.storage.db_root_dir = dir.to_path_buf();
    config
}

/// A thermostat accessory whose target state and temperature are durable.
pub struct Thermostat {
    pub current: CharacteristicHandle,
    pub target_state: CharacteristicHandle,
    pub target_temperature: CharacteristicHandle,
}

pub fn register_thermostat(
    db: &mut AttributeDb,
    aid: u32,
) -> Result<Thermostat> {
    let aid = db.add_accessory(AidRequest::Exact(aid))?;
    let info = db.add_service(aid, ServiceSpec::of(svc::ACCESSORY_INFORMATION)?)?;
    db.add_characteristic(info, CharSpec::of(chr::IDENTIFY)?)?;
    db.add_characteristic(info, CharSpec::of(chr::NAME)?.value(format!("Thermostat {aid}")))?;

    let service = db.add_service(aid, ServiceSpec::of(svc::THERMOSTAT)?.primary())?;
    let current = db.add_characteristic(service, CharSpec::of(chr::CURRENT_TEMPERATURE)?)?;
    let target_state = db.add_characteristic(
        service,
        CharSpec::of(chr::TARGET_HEATING_COOLING_STATE)?.durable(),
    )?;
    let target_temperature = db.add_characteristic(
        service,
        CharSpec::of(chr::TARGET_TEMPERATURE)?.durable(),
    )?;
    Ok(Thermostat {
        current,
        target_state,
        target_temperature,
    })
}
