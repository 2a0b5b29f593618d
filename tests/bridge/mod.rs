use std::sync::Arc;

use hapdb::parse_write_batch;
use hapdb::AttributeDb;
use hapdb::AttributeFilter;
use hapdb::DbConfig;
use hapdb::Fields;
use hapdb::MemoryPersistenceStore;
use hapdb::StorageBackend;
use serde_json::json;

use crate::commons::register_thermostat;
use crate::enable_logger;

fn memory_bridge() -> AttributeDb {
    enable_logger();
    let mut config = DbConfig::default();
    config.storage.backend = StorageBackend::Memory;
    let mut db = AttributeDb::new(config, Arc::new(MemoryPersistenceStore::new())).unwrap();
    register_thermostat(&mut db, 1).unwrap();
    register_thermostat(&mut db, 2).unwrap();
    db.finalize().unwrap();
    db
}

fn parse(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

#[test]
fn test_controller_session() {
    let db = memory_bridge();
    let phone = db.open_observer().unwrap();
    let tablet = db.open_observer().unwrap();

    let subscribe = br#"{"characteristics":[
        {"aid":1,"iid":7,"ev":true},
        {"aid":2,"iid":7,"ev":true},
        {"aid":1,"iid":3,"ev":true}
    ]}"#;
    let results = db.apply_batch(&parse_write_batch(subscribe).unwrap(), Some(tablet));
    let rendered = parse(&db.serialize_write_results(&results).unwrap());
    assert_eq!(
        rendered,
        json!({"characteristics": [
            {"aid": 1, "iid": 7, "status": 0},
            {"aid": 2, "iid": 7, "status": 0},
            {"aid": 1, "iid": 3, "status": -70406}
        ]})
    );

    let write = br#"{"characteristics":[
        {"aid":1,"iid":7,"value":24,"r":true},
        {"aid":2,"iid":7,"value":99}
    ]}"#;
    let results = db.apply_batch(&parse_write_batch(write).unwrap(), Some(phone));
    assert_eq!(
        parse(&db.serialize_write_results(&results).unwrap()),
        json!({"characteristics": [
            {"aid": 1, "iid": 7, "status": 0, "value": 24.0},
            {"aid": 2, "iid": 7, "status": -70410}
        ]})
    );

    let payloads = db.poll();
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        parse(&payloads[&tablet]),
        json!({"characteristics": [{"aid": 1, "iid": 7, "value": 24.0}]})
    );

    let read = db
        .read_characteristics(&[(1, 7), (2, 7)], Fields::VALUE | Fields::EV, Some(tablet))
        .unwrap();
    assert_eq!(
        parse(&read),
        json!({"characteristics": [
            {"aid": 1, "iid": 7, "value": 24.0, "ev": true},
            {"aid": 2, "iid": 7, "value": 16.0, "ev": true}
        ]})
    );

    assert_eq!(db.unsubscribe_all(tablet), 2);
    db.apply_batch(&parse_write_batch(write).unwrap(), Some(phone));
    assert!(db.poll().is_empty());
}

#[test]
fn test_attribute_listing() {
    let db = memory_bridge();
    let listing = parse(&db.serialize_attributes(&AttributeFilter::database()).unwrap());
    let accessories = listing["accessories"].as_array().unwrap();
    assert_eq!(accessories.len(), 2);

    let thermostat = &accessories[1]["services"][1];
    assert_eq!(thermostat["type"], "4A");
    assert_eq!(thermostat["primary"], true);
    let target = &thermostat["characteristics"][2];
    assert_eq!(target["iid"], 7);
    assert_eq!(target["format"], "float");
    assert_eq!(target["perms"], json!(["pr", "pw", "ev"]));
    assert_eq!(target["minValue"], 10.0);
    assert_eq!(target["maxValue"], 38.0);
    assert_eq!(target["unit"], "celsius");

    let one = parse(&db.serialize_attributes(&AttributeFilter::accessory(2)).unwrap());
    assert_eq!(one["accessories"].as_array().unwrap().len(), 1);
    assert_eq!(one["accessories"][0]["aid"], 2);
}

#[test]
fn test_removing_accessory_bumps_version() {
    let mut db = memory_bridge();
    let reader = db.config_reader();
    assert_eq!(reader.version(), 1);

    assert!(db.remove_accessory(2).unwrap());
    assert_eq!(reader.version(), 2);
    assert!(db.find(2, 7).is_none());
    assert!(!db.remove_accessory(2).unwrap());
    assert_eq!(reader.version(), 2);
}
