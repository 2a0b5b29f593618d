use hapdb::AttributeDb;
use hapdb::StatusCode;
use hapdb::Value;
use hapdb::WriteRequest;
use serde_json::json;
use tempfile::tempdir;

use crate::commons::register_thermostat;
use crate::commons::sled_config;
use crate::enable_logger;

#[test]
fn test_durable_values_survive_restart() {
    enable_logger();
    let dir = tempdir().unwrap();

    {
        let mut db = AttributeDb::open(sled_config(dir.path())).unwrap();
        let thermostat = register_thermostat(&mut db, 1).unwrap();
        assert_eq!(db.finalize().unwrap().version, 1);

        let results = db.apply_batch(
            &[
                WriteRequest::write(1, 6, json!(3)),
                WriteRequest::write(1, 7, json!(22.5)),
            ],
            None,
        );
        assert!(results.iter().all(|r| r.status == StatusCode::Ok));
        thermostat.current.set_value(21.0, true).unwrap();
    }

    let mut db = AttributeDb::open(sled_config(dir.path())).unwrap();
    let thermostat = register_thermostat(&mut db, 1).unwrap();
    assert_eq!(thermostat.target_state.get_value(), Value::Uint8(3));
    assert_eq!(thermostat.target_temperature.get_value(), Value::Float(22.5));
    assert_eq!(thermostat.current.get_value(), Value::Float(0.0));

    // unchanged layout keeps its configuration version
    assert_eq!(db.config_record().version, 1);
    assert_eq!(db.finalize().unwrap().version, 1);
}

#[test]
fn test_layout_change_bumps_version_across_restart() {
    enable_logger();
    let dir = tempdir().unwrap();

    let first = {
        let mut db = AttributeDb::open(sled_config(dir.path())).unwrap();
        register_thermostat(&mut db, 1).unwrap();
        db.finalize().unwrap()
    };

    let mut db = AttributeDb::open(sled_config(dir.path())).unwrap();
    register_thermostat(&mut db, 1).unwrap();
    register_thermostat(&mut db, 2).unwrap();
    let second = db.finalize().unwrap();
    assert_eq!(second.version, first.version + 1);
    assert_ne!(second.hash, first.hash);
}

#[test]
fn test_removed_accessory_values_are_forgotten() {
    enable_logger();
    let dir = tempdir().unwrap();

    {
        let mut db = AttributeDb::open(sled_config(dir.path())).unwrap();
        register_thermostat(&mut db, 1).unwrap();
        let second = register_thermostat(&mut db, 2).unwrap();
        db.finalize().unwrap();

        second.target_state.set_value(2, false).unwrap();
        assert!(db.remove_accessory(2).unwrap());
    }

    let mut db = AttributeDb::open(sled_config(dir.path())).unwrap();
    register_thermostat(&mut db, 1).unwrap();
    let second = register_thermostat(&mut db, 2).unwrap();
    assert_eq!(second.target_state.get_value(), Value::Uint8(0));
}
