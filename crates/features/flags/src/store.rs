use crate::watch::{WatchHandle, Watcher, WatcherTable};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, warn};
use veneer_event_bus::{EventBus, WellKnownEvent};
use veneer_kernel::prelude::{FLAGS_KEY, Record, is_truthy};
use veneer_storage::KvStore;

/// Lifecycle of a [`FlagStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    Uninitialized,
    Initializing,
    Ready,
}

/// The internal shared state of a [`FlagStore`].
#[derive(Debug)]
pub struct FlagStoreInner {
    store: KvStore,
    bus: Option<EventBus>,
    state: Mutex<FlagState>,
    cache: RwLock<Record>,
    /// Set once the pre-init cache has been seeded from the mirror.
    seeded: Mutex<bool>,
    watchers: Arc<WatcherTable>,
    /// Serializes persistence so snapshots land in the order they were taken.
    write_lock: tokio::sync::Mutex<()>,
}

/// The persisted flag mapping and the single writer of it.
///
/// The in-memory cache is the source of truth once [`init`](Self::init) completed. Every
/// [`set`](Self::set) persists the whole mapping under the `flags` key and then notifies
/// the watchers of that key synchronously, in registration order.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use veneer_flags::FlagStore;
/// use veneer_storage::KvStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let flags = FlagStore::new(KvStore::with_memory("veneer").unwrap());
/// let defaults = json!({ "ui:showMenuButton": true }).as_object().cloned().unwrap();
/// flags.init(defaults).await;
///
/// let handle = flags.watch("ui:showMenuButton", |value| println!("now {value}"));
/// flags.set("ui:showMenuButton", json!(false)).await;
/// handle.unsubscribe();
///
/// assert_eq!(flags.get("ui:showMenuButton", json!(null)), json!(false));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FlagStore {
    inner: Arc<FlagStoreInner>,
}

impl Deref for FlagStore {
    type Target = FlagStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FlagStore {
    #[must_use]
    pub fn new(store: KvStore) -> Self {
        Self::build(store, None)
    }

    /// Flag store that also announces every change as `flags-updated {key, value}`.
    #[must_use]
    pub fn with_bus(store: KvStore, bus: EventBus) -> Self {
        Self::build(store, Some(bus))
    }

    fn build(store: KvStore, bus: Option<EventBus>) -> Self {
        Self {
            inner: Arc::new(FlagStoreInner {
                store,
                bus,
                state: Mutex::new(FlagState::Uninitialized),
                cache: RwLock::new(Record::new()),
                seeded: Mutex::new(false),
                watchers: Arc::new(WatcherTable::default()),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> FlagState {
        *self.state.lock()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == FlagState::Ready
    }

    /// Loads persisted flags over `defaults` and persists the merged mapping.
    ///
    /// The first call merges `defaults ∪ persisted` with persisted values winning; a
    /// non-object persisted record counts as empty. Values set before the first call win
    /// over both. Later calls merge new defaults under
    /// the current cache, so nothing already set is overwritten.
    pub async fn init(&self, defaults: Record) {
        let _write = self.write_lock.lock().await;

        let was_ready = {
            let mut state = self.state.lock();
            let was_ready = *state == FlagState::Ready;
            if !was_ready {
                *state = FlagState::Initializing;
            }
            was_ready
        };

        let overrides = if was_ready {
            self.cache.read().clone()
        } else {
            let mut persisted = match self.store.get(FLAGS_KEY, Value::Object(Record::new())).await {
                Value::Object(map) => map,
                other => {
                    warn!(found = %other, "Persisted flags are not an object; starting empty");
                    Record::new()
                },
            };
            // Writes made before init may not have reached the durable tier.
            if *self.seeded.lock() {
                persisted.extend(self.cache.read().clone());
            }
            persisted
        };

        let mut merged = defaults;
        merged.extend(overrides);
        *self.cache.write() = merged.clone();

        let count = merged.len();
        self.store.set(FLAGS_KEY, Value::Object(merged)).await;
        *self.state.lock() = FlagState::Ready;

        info!(flags = count, reinit = was_ready, "Flags initialized");
    }

    /// Current value of `key`, or `default` when it has never been set.
    ///
    /// Before [`init`](Self::init) completes, and until a [`set`](Self::set) or
    /// [`get_all`](Self::get_all) seeds the cache, this reads the local mirror instead.
    #[must_use]
    pub fn get(&self, key: &str, default: Value) -> Value {
        if !self.is_ready() && !*self.seeded.lock() {
            return match self.store.mirror_get(FLAGS_KEY, Value::Null) {
                Value::Object(mut map) => map.remove(key).unwrap_or(default),
                _ => default,
            };
        }
        self.cache.read().get(key).cloned().unwrap_or(default)
    }

    /// Whether `key` is truthy, treating an unset key as `default`.
    #[must_use]
    pub fn is_on(&self, key: &str, default: bool) -> bool {
        is_truthy(&self.get(key, Value::Bool(default)))
    }

    /// Snapshot of the whole mapping.
    #[must_use]
    pub fn get_all(&self) -> Record {
        if !self.is_ready() {
            self.seed_from_mirror();
        }
        self.cache.read().clone()
    }

    /// Stores `value` under `key`, persists the mapping and notifies watchers.
    ///
    /// Setting a primitive equal to the current one is a no-op. Arrays and objects always
    /// count as a change.
    pub async fn set(&self, key: &str, value: Value) -> Value {
        let write = self.write_lock.lock().await;
        if !self.is_ready() {
            self.seed_from_mirror();
        }

        let snapshot = {
            let mut cache = self.cache.write();
            if cache.get(key).is_some_and(|current| same_value(current, &value)) {
                return value;
            }
            cache.insert(key.to_owned(), value.clone());
            cache.clone()
        };

        self.store.set(FLAGS_KEY, Value::Object(snapshot)).await;
        drop(write);

        debug!(key, value = %value, "Flag set");
        self.watchers.notify(key, &value);

        if let Some(bus) = &self.bus {
            bus.emit(WellKnownEvent::FlagsUpdated, json!({ "key": key, "value": value }));
        }
        value
    }

    /// Calls `watcher` with the new value after every effective [`set`](Self::set) of `key`.
    pub fn watch<F>(&self, key: &str, watcher: F) -> WatchHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let watcher: Watcher = Arc::new(watcher);
        self.watchers.add(key, watcher)
    }

    #[must_use]
    pub fn watcher_count(&self, key: &str) -> usize {
        self.watchers.count(key)
    }

    /// The underlying dual-tier store.
    #[must_use]
    pub fn kv(&self) -> &KvStore {
        &self.store
    }

    fn seed_from_mirror(&self) {
        let mut seeded = self.seeded.lock();
        if *seeded {
            return;
        }
        *seeded = true;
        if let Value::Object(map) = self.store.mirror_get(FLAGS_KEY, Value::Null) {
            let mut cache = self.cache.write();
            for (k, v) in map {
                cache.entry(k).or_insert(v);
            }
        }
    }
}

/// Value sameness used for change suppression.
///
/// Primitives compare by value (`1` and `1.0` are the same number). Arrays and objects are
/// never the same, so writing a structured value always counts as a change.
#[must_use]
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            x == y || matches!((x.as_f64(), y.as_f64()), (Some(p), Some(q)) if p == q)
        },
        _ => false,
    }
}
