use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{error, trace};

/// Callback invoked with the new value of a watched flag.
pub type Watcher = Arc<dyn Fn(&Value) + Send + Sync>;

/// Per-key watcher lists, notified in registration order.
#[derive(Default)]
pub(crate) struct WatcherTable {
    next_id: AtomicU64,
    by_key: RwLock<FxHashMap<String, Vec<(u64, Watcher)>>>,
}

impl std::fmt::Debug for WatcherTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherTable").field("keys", &self.by_key.read().len()).finish()
    }
}

impl WatcherTable {
    pub(crate) fn add(self: &Arc<Self>, key: &str, watcher: Watcher) -> WatchHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.by_key.write().entry(key.to_owned()).or_default().push((id, watcher));
        trace!(key, watcher = id, "Flag watcher attached");
        WatchHandle { key: key.to_owned(), id, table: Arc::downgrade(self) }
    }

    fn remove(&self, key: &str, id: u64) -> bool {
        let mut by_key = self.by_key.write();
        let Some(list) = by_key.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            by_key.remove(key);
        }
        removed
    }

    /// Calls every watcher of `key`; a panicking watcher is logged and skipped.
    pub(crate) fn notify(&self, key: &str, value: &Value) {
        let watchers: Vec<Watcher> = self
            .by_key
            .read()
            .get(key)
            .map(|list| list.iter().map(|(_, w)| w.clone()).collect())
            .unwrap_or_default();

        for watcher in watchers {
            if catch_unwind(AssertUnwindSafe(|| watcher(value))).is_err() {
                error!(key, "Flag watcher panicked");
            }
        }
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.by_key.read().get(key).map_or(0, Vec::len)
    }
}

/// Handle returned by [`FlagStore::watch`](crate::FlagStore::watch).
///
/// Dropping it leaves the watcher attached.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    key: String,
    id: u64,
    table: Weak<WatcherTable>,
}

impl WatchHandle {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Detaches the watcher. Returns `false` if it was already detached.
    pub fn unsubscribe(&self) -> bool {
        self.table.upgrade().is_some_and(|table| table.remove(&self.key, self.id))
    }
}
