use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use veneer_event_bus::{EventBus, SETTINGS_CHANGED};
use veneer_settings::Settings;
use veneer_storage::{DurableBackend, KvStore, MemoryBackend};

fn record(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn setup() -> (Arc<MemoryBackend>, EventBus, Settings) {
    let backend = Arc::new(MemoryBackend::new());
    let kv = KvStore::new("veneer", Some(backend.clone())).unwrap();
    let bus = EventBus::new();
    (backend, bus.clone(), Settings::new(kv, bus))
}

fn changes(bus: &EventBus) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.on(SETTINGS_CHANGED, move |payload| sink.lock().push(payload.clone()));
    seen
}

#[tokio::test]
async fn define_writes_the_template_when_nothing_is_stored() {
    let (backend, bus, settings) = setup();
    let seen = changes(&bus);

    let current = settings.define("Widget", record(json!({ "color": "red" }))).await;

    assert_eq!(current, record(json!({ "color": "red" })));
    assert_eq!(backend.peek("veneer:mod:Widget:settings"), Some(json!({ "color": "red" })));
    assert_eq!(*seen.lock(), vec![json!({ "module": "Widget", "value": { "color": "red" } })]);
}

#[tokio::test]
async fn define_backfills_only_missing_keys() {
    let (backend, bus, settings) = setup();
    backend.store("veneer:mod:Widget:settings", &json!({ "color": "blue" })).await.unwrap();
    let seen = changes(&bus);

    let current = settings.define("Widget", record(json!({ "color": "red", "size": 2 }))).await;

    assert_eq!(current, record(json!({ "color": "blue", "size": 2 })));
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn define_is_silent_when_the_record_is_complete() {
    let (backend, bus, settings) = setup();
    backend.store("veneer:mod:Widget:settings", &json!({ "color": "blue", "size": 9 })).await.unwrap();
    let seen = changes(&bus);

    let current = settings.define("Widget", record(json!({ "color": "red" }))).await;

    assert_eq!(current, record(json!({ "color": "blue", "size": 9 })));
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn get_falls_back_to_the_template() {
    let (backend, _, settings) = setup();
    assert!(settings.get("Unknown").await.is_empty());

    settings.define("Widget", record(json!({ "color": "red" }))).await;
    backend.remove("veneer:mod:Widget:settings").await.unwrap();

    let mut current = settings.get("Widget").await;
    assert_eq!(current, record(json!({ "color": "red" })));
    current.insert("color".to_owned(), json!("mutated"));
    assert_eq!(settings.template("Widget"), Some(record(json!({ "color": "red" }))));
}

#[tokio::test]
async fn set_merges_shallowly() {
    let (backend, _, settings) = setup();
    settings.define("Widget", record(json!({ "color": "red", "nested": { "a": 1, "b": 2 } }))).await;

    let current = settings.set("Widget", record(json!({ "nested": { "a": 5 } }))).await;

    assert_eq!(current, record(json!({ "color": "red", "nested": { "a": 5 } })));
    assert_eq!(
        backend.peek("veneer:mod:Widget:settings"),
        Some(json!({ "color": "red", "nested": { "a": 5 } }))
    );
}

#[tokio::test]
async fn reset_restores_exactly_the_template() {
    let (_, bus, settings) = setup();
    settings.define("Widget", record(json!({ "color": "red" }))).await;
    settings.set("Widget", record(json!({ "color": "green", "extra": true }))).await;
    let seen = changes(&bus);

    let current = settings.reset("Widget").await;

    assert_eq!(current, record(json!({ "color": "red" })));
    assert_eq!(settings.get("Widget").await, record(json!({ "color": "red" })));
    assert_eq!(*seen.lock(), vec![json!({ "module": "Widget", "value": { "color": "red" } })]);
}

#[tokio::test]
async fn watch_only_sees_its_own_module() {
    let (_, _, settings) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = settings.watch("Widget", move |value| sink.lock().push(value.clone()));

    settings.set("Other", record(json!({ "x": 1 }))).await;
    settings.set("Widget", record(json!({ "y": 2 }))).await;
    subscription.unsubscribe();
    settings.set("Widget", record(json!({ "y": 3 }))).await;

    assert_eq!(*seen.lock(), vec![json!({ "y": 2 })]);
}
