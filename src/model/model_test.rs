use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::*;
use crate::chr;
use crate::storage::MockPersistenceStore;
use crate::svc;
use crate::test_utils::enable_logger;
use crate::Error;
use crate::Format;
use crate::HapType;
use crate::MemoryPersistenceStore;
use crate::NotificationConfig;
use crate::NotificationRouter;
use crate::PersistenceStore;
use crate::RegistrationError;
use crate::StorageError;
use crate::Value;
use crate::ValueError;

fn brightness() -> Characteristic {
    CharSpec::of(chr::BRIGHTNESS).unwrap().build(1, 9).unwrap()
}

#[test]
fn test_char_spec_uses_catalog_defaults() {
    let c = brightness();
    assert_eq!(c.format(), Format::Int);
    assert_eq!(c.perms(), Perms::READ_WRITE_NOTIFY);
    assert_eq!(c.get_value(), Value::Int(0));
    assert_eq!(c.unit(), Some("percentage"));
    let range = c.range().unwrap();
    assert_eq!(range.min, Value::Int(0));
    assert_eq!(range.max, Value::Int(100));
    assert!(c.durable_key().is_none());
}

#[test]
fn test_char_spec_unknown_type() {
    let err = CharSpec::of(HapType(0xFFFE)).unwrap_err();
    assert!(matches!(
        err,
        Error::Registration(RegistrationError::UnknownCharacteristic(_))
    ));
    assert!(ServiceSpec::named("Toaster").is_err());
}

#[test]
fn test_char_spec_custom_range_and_initial_value() {
    let c = CharSpec::of(chr::TARGET_TEMPERATURE)
        .unwrap()
        .range(5, 30)
        .step(0.5)
        .value(21.5)
        .build(1, 10)
        .unwrap();
    let range = c.range().unwrap();
    assert_eq!(range.min, Value::Float(5.0));
    assert_eq!(range.max, Value::Float(30.0));
    assert_eq!(range.step, Some(Value::Float(0.5)));
    assert_eq!(c.get_value(), Value::Float(21.5));
    assert_eq!(c.get_pending_value(), Value::Float(21.5));
}

#[test]
fn test_char_spec_rejects_range_on_string() {
    let err = CharSpec::of(chr::NAME)
        .unwrap()
        .range(0, 1)
        .build(1, 2)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Registration(RegistrationError::RangeNotSupported { .. })
    ));
}

#[test]
fn test_char_spec_rejects_valid_values_on_float() {
    let err = CharSpec::of(chr::HUE)
        .unwrap()
        .valid_values([0, 1])
        .build(1, 2)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Registration(RegistrationError::ValidValuesNotSupported { .. })
    ));
}

#[test]
fn test_char_spec_rejects_unrepresentable_initial_value() {
    let err = CharSpec::of(chr::BATTERY_LEVEL)
        .unwrap()
        .value(300u16)
        .build(1, 2)
        .unwrap_err();
    assert!(matches!(err, Error::Value(ValueError::Unrepresentable { .. })));
}

#[test]
fn test_char_spec_durable_key() {
    let c = CharSpec::of(chr::ON).unwrap().durable().build(1, 9).unwrap();
    assert_eq!(c.durable_key(), Some("002500000001009"));
}

#[test]
fn test_char_spec_durable_rejects_wide_instance_id() {
    let err = CharSpec::of(chr::ON)
        .unwrap()
        .durable()
        .build(3, 4096)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Registration(RegistrationError::NotDurable { aid: 3, iid: 4096 })
    ));
}

#[test]
fn test_char_spec_perm_edits() {
    let c = CharSpec::of(chr::ON)
        .unwrap()
        .remove_perms(Perms::EVENTS)
        .add_perms(Perms::HIDDEN)
        .description("relay")
        .build(1, 2)
        .unwrap();
    assert_eq!(c.perms().tags(), vec!["pr", "pw", "hd"]);
    assert_eq!(c.description(), Some("relay"));
}

#[test]
fn test_admits_range_and_valid_values() {
    let c = CharSpec::of(chr::TARGET_HEATING_COOLING_STATE)
        .unwrap()
        .valid_values([0, 1, 2])
        .build(1, 2)
        .unwrap();
    assert!(c.admits(&Value::Uint8(2)));
    assert!(!c.admits(&Value::Uint8(3)));

    let b = brightness();
    assert!(b.admits(&Value::Int(100)));
    assert!(!b.admits(&Value::Int(150)));
}

#[test]
fn test_stage_and_revert() {
    let c = brightness();
    c.stage(Value::Int(40));
    assert_eq!(c.get_pending_value(), Value::Int(40));
    assert_eq!(c.get_value(), Value::Int(0));

    c.revert_staged();
    assert_eq!(c.get_pending_value(), Value::Int(0));
    assert!(!c.was_written());
}

#[test]
fn test_commit_staged_sets_flag() {
    let c = brightness();
    c.stage(Value::Int(40));
    c.commit_staged(UpdateFlag::WrittenWithResponse);

    assert_eq!(c.get_value(), Value::Int(40));
    assert_eq!(c.update_flag(), UpdateFlag::WrittenWithResponse);
    assert!(c.was_written());

    c.clear_update_flag();
    assert!(!c.was_written());
}

#[test]
fn test_subscribe_is_idempotent() {
    let c = brightness();
    let o = crate::ObserverId(7);
    assert!(c.subscribe(o));
    assert!(!c.subscribe(o));
    assert_eq!(c.subscriber_count(), 1);

    assert!(c.unsubscribe(o));
    assert!(!c.unsubscribe(o));
    assert_eq!(c.subscriber_count(), 0);
}

#[test]
fn test_retire_clears_subscribers() {
    let c = brightness();
    c.subscribe(crate::ObserverId(1));
    c.retire();
    assert!(c.is_retired());
    assert_eq!(c.subscriber_count(), 0);
}

#[test]
fn test_time_since_update_resets_on_store() {
    let c = brightness();
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(c.time_since_update() >= std::time::Duration::from_millis(20));

    c.store_local(Value::Int(5));
    assert!(c.time_since_update() < std::time::Duration::from_millis(20));
}

#[test]
fn test_service_spec_from_catalog() {
    let s = ServiceSpec::of(svc::LIGHT_BULB).unwrap().primary().build(1, 8);
    assert_eq!(s.name(), "LightBulb");
    assert!(s.is_primary());
    assert!(!s.is_hidden());
    assert_eq!(s.required, &[chr::ON]);
}

#[test]
fn test_service_approve_runs_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let s = ServiceSpec::of(svc::SWITCH)
        .unwrap()
        .on_update(move |c| {
            seen.fetch_add(1, Ordering::SeqCst);
            c.get_pending_value() != Value::Bool(true)
        })
        .build(1, 8);

    let on = CharSpec::of(chr::ON).unwrap().build(1, 9).unwrap();
    on.stage(Value::Bool(true));
    assert!(!s.approve(&on));
    on.stage(Value::Bool(false));
    assert!(s.approve(&on));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_accessory_iid_reset() {
    let mut a = Accessory::new(1);
    assert_eq!(a.peek_iid().unwrap(), 1);
    a.claim_iid(1);
    a.claim_iid(2);

    assert!(matches!(
        a.reset_iid(2),
        Err(RegistrationError::InstanceIdConflict { requested: 2, last: 2, .. })
    ));
    assert!(a.reset_iid(0).is_err());

    a.reset_iid(100).unwrap();
    assert_eq!(a.peek_iid().unwrap(), 100);
}

fn handle_for(
    c: Characteristic,
    store: Arc<MemoryPersistenceStore>,
) -> (CharacteristicHandle, NotificationRouter) {
    let router = NotificationRouter::new(&NotificationConfig::default());
    let handle = CharacteristicHandle::new(Arc::new(c), router.sink(), store);
    (handle, router)
}

#[test]
fn test_local_set_out_of_range_is_stored() {
    enable_logger();
    let store = Arc::new(MemoryPersistenceStore::new());
    let (handle, router) = handle_for(brightness(), store);

    handle.set_value(150, true).unwrap();

    assert_eq!(handle.get_value(), Value::Int(150));
    assert_eq!(handle.get_pending_value(), Value::Int(150));
    assert_eq!(router.pending(), 1);
}

#[test]
fn test_local_set_rejects_unrepresentable() {
    let store = Arc::new(MemoryPersistenceStore::new());
    let c = CharSpec::of(chr::BATTERY_LEVEL).unwrap().build(1, 5).unwrap();
    let (handle, router) = handle_for(c, store);

    assert!(handle.set_value(-1, true).is_err());
    assert_eq!(handle.get_value(), Value::Uint8(100));
    assert_eq!(router.pending(), 0);
}

#[test]
fn test_local_set_without_notify_queues_nothing() {
    let store = Arc::new(MemoryPersistenceStore::new());
    let (handle, router) = handle_for(brightness(), store);

    handle.set_value(10, false).unwrap();
    assert_eq!(router.pending(), 0);
}

#[test]
fn test_local_set_writes_through_durable_key() {
    let store = Arc::new(MemoryPersistenceStore::new());
    let c = CharSpec::of(chr::ON).unwrap().durable().build(1, 9).unwrap();
    let (handle, _router) = handle_for(c, store.clone());

    handle.set_value(true, false).unwrap();

    assert_eq!(store.commits(), 1);
    assert_eq!(
        store.get("002500000001009").unwrap(),
        Some(Value::Bool(true).to_raw())
    );
}

#[test]
fn test_local_set_on_retired_characteristic() {
    let store = Arc::new(MemoryPersistenceStore::new());
    let c = CharSpec::of(chr::ON).unwrap().durable().build(1, 9).unwrap();
    let (handle, router) = handle_for(c, store.clone());
    handle.characteristic().retire();

    handle.set_value(true, true).unwrap();

    assert_eq!(handle.get_value(), Value::Bool(true));
    assert_eq!(router.pending(), 0);
    assert_eq!(store.commits(), 0);
}

#[test]
fn test_local_set_durable_failure_keeps_value() {
    enable_logger();
    let mut store = MockPersistenceStore::new();
    store.expect_set().returning(|_, _| {
        Err(Error::Storage(StorageError::DataCorruption {
            key: "002500000001009".to_string(),
            reason: "read-only medium".to_string(),
        }))
    });
    store.expect_commit().never();
    let router = NotificationRouter::new(&NotificationConfig::default());
    let c = CharSpec::of(chr::ON).unwrap().durable().build(1, 9).unwrap();
    let handle = CharacteristicHandle::new(Arc::new(c), router.sink(), Arc::new(store));
    let observer = router.open_observer().unwrap();
    assert!(router.subscribe(handle.characteristic(), observer));

    assert!(handle.set_value(true, true).is_err());

    assert_eq!(handle.get_value(), Value::Bool(false));
    assert_eq!(router.pending(), 0);
    assert!(router.drain().is_empty());
}
