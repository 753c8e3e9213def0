use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use veneer_event_bus::{EventBus, WellKnownEvent};
use veneer_flags::{FlagState, FlagStore};
use veneer_storage::{DurableBackend, KvStore, MemoryBackend, StorageError};

fn record(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn memory_store() -> (Arc<MemoryBackend>, KvStore) {
    let backend = Arc::new(MemoryBackend::new());
    let kv = KvStore::new("veneer", Some(backend.clone())).unwrap();
    (backend, kv)
}

#[derive(Debug)]
struct Unreachable;

#[async_trait]
impl DurableBackend for Unreachable {
    async fn load(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Unavailable { message: "offline".into(), context: None })
    }

    async fn store(&self, _key: &str, _value: &Value) -> Result<(), StorageError> {
        Err(StorageError::Unavailable { message: "offline".into(), context: None })
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn init_prefers_persisted_values_over_defaults() {
    let (backend, kv) = memory_store();
    backend.store("veneer:flags", &json!({ "a": false, "b": 2 })).await.unwrap();

    let flags = FlagStore::new(kv.clone());
    flags.init(record(json!({ "a": true, "c": "x" }))).await;

    assert_eq!(flags.state(), FlagState::Ready);
    assert_eq!(flags.get_all(), record(json!({ "a": false, "b": 2, "c": "x" })));
    assert_eq!(backend.peek("veneer:flags"), Some(json!({ "a": false, "b": 2, "c": "x" })));
    assert_eq!(kv.mirror_get("flags", json!({})), json!({ "a": false, "b": 2, "c": "x" }));
}

#[tokio::test]
async fn second_init_keeps_current_values() {
    let (_, kv) = memory_store();
    let flags = FlagStore::new(kv);
    flags.init(record(json!({ "a": 1 }))).await;
    flags.set("a", json!(5)).await;

    flags.init(record(json!({ "a": 1, "new": true }))).await;

    assert_eq!(flags.get("a", Value::Null), json!(5));
    assert_eq!(flags.get("new", Value::Null), json!(true));
}

#[tokio::test]
async fn non_object_record_counts_as_empty() {
    let (backend, kv) = memory_store();
    backend.store("veneer:flags", &json!([1, 2, 3])).await.unwrap();

    let flags = FlagStore::new(kv);
    flags.init(record(json!({ "a": true }))).await;
    assert_eq!(flags.get_all(), record(json!({ "a": true })));
}

#[tokio::test]
async fn unavailable_backend_does_not_block_init() {
    let kv = KvStore::new("veneer", Some(Arc::new(Unreachable))).unwrap();
    let flags = FlagStore::new(kv);

    flags.init(record(json!({ "ui:dark": true }))).await;
    assert!(flags.is_ready());
    assert!(flags.is_on("ui:dark", false));

    flags.set("ui:dark", json!(false)).await;
    assert!(!flags.is_on("ui:dark", true), "cache stays authoritative");
}

#[tokio::test]
async fn watchers_fire_in_order_after_persisting() {
    let (backend, kv) = memory_store();
    let flags = FlagStore::new(kv);
    flags.init(serde_json::Map::new()).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    for tag in ["one", "two"] {
        let log = log.clone();
        let backend = backend.clone();
        flags.watch("k", move |value| {
            let persisted = backend.peek("veneer:flags").unwrap();
            log.lock().push((tag, value.clone(), persisted["k"].clone()));
        });
    }

    flags.set("k", json!("v")).await;

    assert_eq!(
        *log.lock(),
        [("one", json!("v"), json!("v")), ("two", json!("v"), json!("v"))]
    );
}

#[tokio::test]
async fn equal_primitive_is_not_a_change() {
    let (_, kv) = memory_store();
    let flags = FlagStore::new(kv);
    flags.init(record(json!({ "n": 1, "obj": {} }))).await;

    let calls = Arc::new(Mutex::new(0));
    for key in ["n", "obj"] {
        let calls = calls.clone();
        flags.watch(key, move |_| *calls.lock() += 1);
    }

    flags.set("n", json!(1)).await;
    assert_eq!(*calls.lock(), 0);

    flags.set("obj", json!({})).await;
    assert_eq!(*calls.lock(), 1, "structured values always notify");
}

#[tokio::test]
async fn panicking_watcher_does_not_stop_others() {
    let (_, kv) = memory_store();
    let flags = FlagStore::new(kv);
    flags.init(serde_json::Map::new()).await;

    let hits = Arc::new(Mutex::new(0));
    flags.watch("k", |_| panic!("watcher failure"));
    let counter = hits.clone();
    flags.watch("k", move |_| *counter.lock() += 1);

    assert_eq!(flags.set("k", json!(true)).await, json!(true));
    assert_eq!(*hits.lock(), 1);
    assert_eq!(flags.get("k", Value::Null), json!(true), "state change is not rolled back");
}

#[tokio::test]
async fn unsubscribed_watchers_stay_quiet() {
    let (_, kv) = memory_store();
    let flags = FlagStore::new(kv);
    flags.init(serde_json::Map::new()).await;

    let hits = Arc::new(Mutex::new(0));
    let counter = hits.clone();
    let handle = flags.watch("k", move |_| *counter.lock() += 1);
    assert_eq!(flags.watcher_count("k"), 1);

    assert!(handle.unsubscribe());
    assert!(!handle.unsubscribe());
    flags.set("k", json!(1)).await;

    assert_eq!(*hits.lock(), 0);
    assert_eq!(flags.watcher_count("k"), 0);
}

#[tokio::test]
async fn changes_are_announced_on_the_bus() {
    let (_, kv) = memory_store();
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.on(WellKnownEvent::FlagsUpdated, move |payload| sink.lock().push(payload.clone()));

    let flags = FlagStore::with_bus(kv, bus);
    flags.init(serde_json::Map::new()).await;
    flags.set("ui:dark", json!(true)).await;
    flags.set("ui:dark", json!(true)).await;

    assert_eq!(*seen.lock(), [json!({ "key": "ui:dark", "value": true })]);
}

#[tokio::test]
async fn set_before_init_builds_on_the_mirror() {
    let (_, kv) = memory_store();
    kv.mirror_set("flags", &json!({ "kept": 1 }));
    let flags = FlagStore::new(kv.clone());

    flags.set("early", json!(true)).await;
    assert_eq!(kv.mirror_get("flags", json!({})), json!({ "kept": 1, "early": true }));
    assert_eq!(flags.get("early", json!(false)), json!(true));
}

#[tokio::test]
async fn set_before_init_is_readable_without_a_durable_write() {
    let kv = KvStore::new("veneer", Some(Arc::new(Unreachable))).unwrap();
    let flags = FlagStore::new(kv.clone());

    flags.set("k", json!(true)).await;

    assert_eq!(kv.mirror_get("flags", json!({})), json!({}), "mirror waits for the durable tier");
    assert_eq!(flags.get("k", json!("default")), json!(true));
    assert_eq!(flags.get_all(), record(json!({ "k": true })));

    flags.init(record(json!({ "k": false, "other": 1 }))).await;
    assert_eq!(flags.get_all(), record(json!({ "k": true, "other": 1 })));
}
