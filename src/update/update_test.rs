use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use super::*;
use crate::chr;
use crate::storage::MockPersistenceStore;
use crate::svc;
use crate::test_utils::enable_logger;
use crate::AidRequest;
use crate::CharSpec;
use crate::Error;
use crate::Format;
use crate::HapType;
use crate::MemoryPersistenceStore;
use crate::NotificationConfig;
use crate::ServiceSpec;
use crate::StorageError;

/// aid 1: information(1) identify(2), switch(3) on(4) mode(5) brightness(6) name(7)
struct Fixture {
    tree: AttributeTree,
    router: NotificationRouter,
    store: MemoryPersistenceStore,
}

impl Fixture {
    fn new() -> Self {
        Self::with_service(ServiceSpec::of(svc::SWITCH).unwrap())
    }

    fn with_service(service: ServiceSpec) -> Self {
        enable_logger();
        let mut tree = AttributeTree::new(150);
        let aid = tree.add_accessory(AidRequest::Exact(1)).unwrap();
        let info = tree
            .add_service(aid, ServiceSpec::of(svc::ACCESSORY_INFORMATION).unwrap())
            .unwrap();
        tree.add_characteristic(info, CharSpec::of(chr::IDENTIFY).unwrap())
            .unwrap();
        let key = tree.add_service(aid, service).unwrap();
        tree.add_characteristic(key, CharSpec::of(chr::ON).unwrap().durable())
            .unwrap();
        tree.add_characteristic(
            key,
            CharSpec::custom(HapType(0xF01), "Mode", Format::Uint8, Perms::READ_WRITE_NOTIFY)
                .valid_values([0, 1, 2]),
        )
        .unwrap();
        tree.add_characteristic(key, CharSpec::of(chr::BRIGHTNESS).unwrap())
            .unwrap();
        tree.add_characteristic(key, CharSpec::of(chr::NAME).unwrap())
            .unwrap();

        Self {
            tree,
            router: NotificationRouter::new(&NotificationConfig::default()),
            store: MemoryPersistenceStore::new(),
        }
    }

    fn apply(
        &self,
        batch: &[WriteRequest],
        origin: Option<ObserverId>,
    ) -> Vec<WriteResult> {
        UpdateEngine::new(&self.tree, &self.router, &self.store).apply(batch, origin)
    }

    fn value(
        &self,
        iid: u32,
    ) -> Value {
        self.tree.find(1, iid).unwrap().get_value()
    }
}

#[test]
fn test_write_with_response() {
    let f = Fixture::new();
    let results = f.apply(&[WriteRequest::write(1, 4, json!(true)).with_response()], None);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, StatusCode::Ok);
    assert_eq!(results[0].value, Some(Value::Bool(true)));
    assert_eq!(f.value(4), Value::Bool(true));
    assert_eq!(f.router.pending(), 1);

    let on = f.tree.find(1, 4).unwrap();
    assert_eq!(on.update_flag(), UpdateFlag::WrittenWithResponse);
    assert_eq!(on.get_pending_value(), Value::Bool(true));
}

#[test]
fn test_write_without_response_has_no_value() {
    let f = Fixture::new();
    let results = f.apply(&[WriteRequest::write(1, 6, json!(40))], None);
    assert_eq!(results[0].status, StatusCode::Ok);
    assert_eq!(results[0].value, None);
    assert_eq!(f.tree.find(1, 6).unwrap().update_flag(), UpdateFlag::Written);
}

#[test]
fn test_unknown_resource() {
    let f = Fixture::new();
    let results = f.apply(
        &[
            WriteRequest::write(1, 99, json!(true)),
            WriteRequest::write(2, 4, json!(true)),
        ],
        None,
    );
    assert!(results.iter().all(|r| r.status == StatusCode::UnknownResource));
}

#[test]
fn test_empty_item_is_invalid() {
    let f = Fixture::new();
    let item = WriteRequest {
        aid: 1,
        iid: 4,
        value: None,
        events: None,
        response: false,
    };
    assert_eq!(f.apply(&[item], None)[0].status, StatusCode::InvalidValue);
}

#[test]
fn test_write_without_write_permission() {
    let f = Fixture::new();
    let results = f.apply(&[WriteRequest::write(1, 7, json!("kitchen"))], None);
    assert_eq!(results[0].status, StatusCode::ReadOnly);
    assert_eq!(f.value(7), Value::String("unnamed".to_string()));
}

#[test]
fn test_events_without_notify_permission() {
    let f = Fixture::new();
    let observer = f.router.open_observer().unwrap();
    let results = f.apply(&[WriteRequest::events(1, 2, true)], Some(observer));
    assert_eq!(results[0].status, StatusCode::NotificationNotSupported);
}

#[test]
fn test_value_outside_valid_values() {
    let f = Fixture::new();
    let results = f.apply(&[WriteRequest::write(1, 5, json!(5))], None);
    assert_eq!(results[0].status, StatusCode::InvalidValue);
    assert_eq!(f.value(5), Value::Uint8(0));
    assert_eq!(f.router.pending(), 0);

    let results = f.apply(&[WriteRequest::write(1, 5, json!(2))], None);
    assert_eq!(results[0].status, StatusCode::Ok);
    assert_eq!(f.value(5), Value::Uint8(2));
}

#[test]
fn test_value_outside_range() {
    let f = Fixture::new();
    let results = f.apply(&[WriteRequest::write(1, 6, json!(150))], None);
    assert_eq!(results[0].status, StatusCode::InvalidValue);
    assert_eq!(f.value(6), Value::Int(0));
}

#[test]
fn test_value_of_wrong_kind() {
    let f = Fixture::new();
    let results = f.apply(
        &[
            WriteRequest::write(1, 4, json!("maybe")),
            WriteRequest::write(1, 6, json!(12.5)),
            WriteRequest::write(1, 4, json!([1])),
        ],
        None,
    );
    assert!(results.iter().all(|r| r.status == StatusCode::InvalidValue));
    assert_eq!(f.value(4), Value::Bool(false));
}

#[test]
fn test_items_are_independent() {
    let f = Fixture::new();
    let results = f.apply(
        &[
            WriteRequest::write(1, 4, json!(1)),
            WriteRequest::write(1, 6, json!(-1)),
            WriteRequest::write(1, 6, json!(80)),
        ],
        None,
    );
    let statuses: Vec<StatusCode> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![StatusCode::Ok, StatusCode::InvalidValue, StatusCode::Ok]
    );
    assert_eq!(f.value(4), Value::Bool(true));
    assert_eq!(f.value(6), Value::Int(80));
}

#[test]
fn test_handler_sees_pending_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let f = Fixture::with_service(ServiceSpec::of(svc::SWITCH).unwrap().on_update(move |c| {
        recorded.lock().push((c.get_value(), c.get_pending_value()));
        true
    }));

    f.apply(&[WriteRequest::write(1, 6, json!(30))], None);
    assert_eq!(*seen.lock(), vec![(Value::Int(0), Value::Int(30))]);
}

#[test]
fn test_handler_veto_reverts() {
    let f = Fixture::with_service(
        ServiceSpec::of(svc::SWITCH)
            .unwrap()
            .on_update(|c| c.get_pending_value().as_i64() != Some(13)),
    );

    let results = f.apply(&[WriteRequest::write(1, 6, json!(13))], None);
    assert_eq!(results[0].status, StatusCode::UnableToPerform);
    let brightness = f.tree.find(1, 6).unwrap();
    assert_eq!(brightness.get_value(), Value::Int(0));
    assert_eq!(brightness.get_pending_value(), Value::Int(0));
    assert!(!brightness.was_written());
    assert_eq!(f.router.pending(), 0);
}

#[test]
fn test_durable_write_is_committed() {
    let f = Fixture::new();
    f.apply(&[WriteRequest::write(1, 4, json!(true))], None);

    let key = f.tree.find(1, 4).unwrap().durable_key().unwrap().to_string();
    assert_eq!(key, "002500000001004");
    assert_eq!(
        f.store.get(&key).unwrap(),
        Some(Value::Bool(true).to_raw())
    );
    assert_eq!(f.store.commits(), 1);

    // non-durable writes never touch the store
    f.apply(&[WriteRequest::write(1, 6, json!(10))], None);
    assert_eq!(f.store.commits(), 1);
}

#[test]
fn test_durable_write_failure_leaves_value() {
    let f = Fixture::new();
    let mut store = MockPersistenceStore::new();
    store.expect_set().returning(|_, _| {
        Err(Error::Storage(StorageError::DataCorruption {
            key: "k".to_string(),
            reason: "read-only medium".to_string(),
        }))
    });

    let engine = UpdateEngine::new(&f.tree, &f.router, &store);
    let results = engine.apply(&[WriteRequest::write(1, 4, json!(true))], None);
    assert_eq!(results[0].status, StatusCode::UnableToPerform);
    assert_eq!(f.value(4), Value::Bool(false));
    assert_eq!(f.router.pending(), 0);
}

#[test]
fn test_subscribe_and_unsubscribe() {
    let f = Fixture::new();
    let observer = f.router.open_observer().unwrap();
    let on = f.tree.find(1, 4).unwrap();

    let results = f.apply(&[WriteRequest::events(1, 4, true)], Some(observer));
    assert_eq!(results[0].status, StatusCode::Ok);
    assert!(on.is_subscribed(observer));

    f.apply(&[WriteRequest::events(1, 4, true)], Some(observer));
    assert_eq!(on.subscriber_count(), 1);

    f.apply(&[WriteRequest::events(1, 4, false)], Some(observer));
    assert!(!on.is_subscribed(observer));
}

#[test]
fn test_subscribe_needs_observer() {
    let f = Fixture::new();
    let results = f.apply(&[WriteRequest::events(1, 4, true)], None);
    assert_eq!(results[0].status, StatusCode::UnableToPerform);
}

#[test]
fn test_value_with_events_needs_observer() {
    let f = Fixture::new();
    let item = WriteRequest {
        aid: 1,
        iid: 6,
        value: Some(json!(55)),
        events: Some(true),
        response: false,
    };
    let results = f.apply(&[item], None);

    assert_eq!(results[0].status, StatusCode::UnableToPerform);
    assert_eq!(f.value(6), Value::Int(0));
    assert_eq!(f.tree.find(1, 6).unwrap().update_flag(), UpdateFlag::None);
    assert_eq!(f.router.pending(), 0);
}

#[test]
fn test_events_from_closed_observer() {
    let f = Fixture::new();
    let observer = f.router.open_observer().unwrap();
    f.router.close_observer(observer);
    let item = WriteRequest {
        aid: 1,
        iid: 6,
        value: Some(json!(55)),
        events: Some(true),
        response: false,
    };
    let results = f.apply(&[item], Some(observer));

    assert_eq!(results[0].status, StatusCode::UnableToPerform);
    assert_eq!(f.value(6), Value::Int(0));
    assert_eq!(f.router.pending(), 0);
    assert!(!f.tree.find(1, 6).unwrap().is_subscribed(observer));
}

#[test]
fn test_writer_is_not_notified_of_own_write() {
    let f = Fixture::new();
    let writer = f.router.open_observer().unwrap();
    let watcher = f.router.open_observer().unwrap();
    f.apply(&[WriteRequest::events(1, 4, true)], Some(writer));
    f.apply(&[WriteRequest::events(1, 4, true)], Some(watcher));

    f.apply(&[WriteRequest::write(1, 4, json!(true))], Some(writer));
    let payloads = f.router.drain();
    assert_eq!(payloads.len(), 1);
    assert!(payloads.contains_key(&watcher));
}

#[test]
fn test_two_writers_same_characteristic() {
    let f = Fixture::new();
    let a = f.router.open_observer().unwrap();
    let b = f.router.open_observer().unwrap();
    let c = f.router.open_observer().unwrap();
    for observer in [a, b, c] {
        f.apply(&[WriteRequest::events(1, 6, true)], Some(observer));
    }

    f.apply(&[WriteRequest::write(1, 6, json!(20))], Some(a));
    f.apply(&[WriteRequest::write(1, 6, json!(70))], Some(b));

    let payloads = f.router.drain();
    let expected = json!({"characteristics": [{"aid": 1, "iid": 6, "value": 70}]});
    let body = |o: ObserverId| serde_json::from_slice::<serde_json::Value>(&payloads[&o]).unwrap();
    assert_eq!(body(c), expected);
    assert_eq!(body(a), expected);
    assert!(!payloads.contains_key(&b));
}

#[test]
fn test_parse_write_batch() {
    let body = br#"{"characteristics":[
        {"aid":1,"iid":4,"value":true,"r":true},
        {"aid":1,"iid":6,"ev":false}
    ]}"#;
    let batch = parse_write_batch(body).unwrap();
    assert_eq!(
        batch,
        vec![
            WriteRequest::write(1, 4, json!(true)).with_response(),
            WriteRequest::events(1, 6, false),
        ]
    );
    assert!(parse_write_batch(b"{}").is_err());
}

#[test]
fn test_render_write_results() {
    let results = vec![
        WriteResult {
            aid: 1,
            iid: 4,
            status: StatusCode::Ok,
            value: Some(Value::Bool(true)),
        },
        WriteResult {
            aid: 1,
            iid: 99,
            status: StatusCode::UnknownResource,
            value: None,
        },
    ];
    let json: serde_json::Value = serde_json::from_slice(&render_write_results(&results).unwrap()).unwrap();
    assert_eq!(
        json,
        json!({"characteristics": [
            {"aid": 1, "iid": 4, "status": 0, "value": true},
            {"aid": 1, "iid": 99, "status": -70409}
        ]})
    );
}

#[test]
fn test_status_code_values() {
    assert_eq!(StatusCode::Ok.code(), 0);
    assert_eq!(StatusCode::InvalidValue.code(), -70410);
    assert!(!StatusCode::ReadOnly.is_ok());
    assert_eq!(StatusCode::WriteOnly.to_string(), "WriteOnly(-70405)");
}
