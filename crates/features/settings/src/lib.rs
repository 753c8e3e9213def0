//! Settings slice: one persisted JSON object per module, backed by a default template.
//!
//! Records live under `mod:<name>:settings`. Every write is announced on the bus as
//! `settings:changed {module, value}`, which is also what [`Settings::watch`] listens to.

use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};
use veneer_domain::keys::settings_key;
use veneer_event_bus::{EventBus, SETTINGS_CHANGED, Subscription};
use veneer_kernel::prelude::Record;
use veneer_storage::KvStore;

/// The internal shared state of [`Settings`].
#[derive(Debug)]
pub struct SettingsInner {
    store: KvStore,
    bus: EventBus,
    templates: RwLock<FxHashMap<String, Record>>,
}

/// Per-module settings namespace.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use veneer_event_bus::EventBus;
/// use veneer_settings::Settings;
/// use veneer_storage::KvStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let settings = Settings::new(KvStore::with_memory("veneer").unwrap(), EventBus::new());
/// let defaults = json!({ "color": "red", "size": 2 }).as_object().cloned().unwrap();
///
/// settings.define("Widget", defaults).await;
/// let patch = json!({ "size": 3 }).as_object().cloned().unwrap();
/// let current = settings.set("Widget", patch).await;
///
/// assert_eq!(current["color"], "red");
/// assert_eq!(current["size"], 3);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    inner: Arc<SettingsInner>,
}

impl Deref for Settings {
    type Target = SettingsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Settings {
    #[must_use]
    pub fn new(store: KvStore, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(SettingsInner {
                store,
                bus,
                templates: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    /// Registers `defaults` as the template of `name` and backfills the persisted record.
    ///
    /// Without a persisted object the template is written as-is. Otherwise only keys
    /// missing from the record are added; nothing is written or announced when none are.
    pub async fn define(&self, name: &str, defaults: Record) -> Record {
        self.templates.write().insert(name.to_owned(), defaults.clone());
        let key = settings_key(name);

        let Value::Object(mut current) = self.store.get(&key, Value::Null).await else {
            self.persist(name, &defaults).await;
            return defaults;
        };

        let mut added = 0usize;
        for (k, v) in defaults {
            if !current.contains_key(&k) {
                current.insert(k, v);
                added += 1;
            }
        }

        if added > 0 {
            debug!(module = name, added, "Backfilled settings from template");
            self.persist(name, &current).await;
        }
        current
    }

    /// The persisted record, or a copy of the template when none is stored.
    pub async fn get(&self, name: &str) -> Record {
        let key = settings_key(name);
        match self.store.get(&key, Value::Null).await {
            Value::Object(record) => {
                self.store.mirror_set(&key, &Value::Object(record.clone()));
                record
            },
            Value::Null => self.template(name).unwrap_or_default(),
            other => {
                warn!(module = name, found = %other, "Malformed settings record; using template");
                self.template(name).unwrap_or_default()
            },
        }
    }

    /// Shallow-merges `patch` over the current record and persists the result.
    pub async fn set(&self, name: &str, patch: Record) -> Record {
        let mut next = self.get(name).await;
        next.extend(patch);
        self.persist(name, &next).await;
        next
    }

    /// Drops the persisted record and rewrites exactly the template.
    pub async fn reset(&self, name: &str) -> Record {
        let key = settings_key(name);
        self.store.delete(&key).await;

        let template = self.template(name).unwrap_or_default();
        self.persist(name, &template).await;
        template
    }

    /// Calls `watcher` with the new record whenever settings of `name` change.
    pub fn watch<F>(&self, name: &str, watcher: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let name = name.to_owned();
        self.bus.on(SETTINGS_CHANGED, move |payload| {
            if payload.get("module").and_then(Value::as_str) == Some(name.as_str()) {
                watcher(payload.get("value").unwrap_or(&Value::Null));
            }
        })
    }

    /// The registered template of `name`, if any.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<Record> {
        self.templates.read().get(name).cloned()
    }

    async fn persist(&self, name: &str, record: &Record) {
        let value = Value::Object(record.clone());
        self.store.set(&settings_key(name), value.clone()).await;
        self.bus.emit(SETTINGS_CHANGED, json!({ "module": name, "value": value }));
    }
}
