use crate::disposer::{Disposer, InitFn};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::mem;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::MutexGuard;
use tracing::{debug, info, trace};
use veneer_domain::keys::{FlagKeys, derive_keys};
use veneer_event_bus::{EventBus, MODULE_STARTED, MODULE_STOPPED};
use veneer_flags::{FlagStore, WatchHandle};
use veneer_kernel::prelude::{ModuleMeta, guard};

/// Read-only view of one registered module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSnapshot {
    pub name: String,
    pub meta: ModuleMeta,
    pub enabled_key: String,
    pub enabled_key_alt: String,
    pub booted: bool,
    pub has_init: bool,
}

struct ModuleEntry {
    meta: ModuleMeta,
    init: Option<InitFn>,
    keys: FlagKeys,
    booted: bool,
    /// Behind a mutex so the table stays `Sync` while disposers are only `Send`.
    disposer: Mutex<Disposer>,
    /// Kept so the flag watchers live exactly as long as the descriptor.
    _watches: Vec<WatchHandle>,
}

impl ModuleEntry {
    fn snapshot(&self, name: &str) -> ModuleSnapshot {
        ModuleSnapshot {
            name: name.to_owned(),
            meta: self.meta.clone(),
            enabled_key: self.keys.canonical.clone(),
            enabled_key_alt: self.keys.alternate.clone(),
            booted: self.booted,
            has_init: self.init.is_some(),
        }
    }
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("meta", &self.meta)
            .field("keys", &self.keys)
            .field("booted", &self.booted)
            .field("disposer", &self.disposer)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct ModuleTable {
    order: Vec<String>,
    entries: FxHashMap<String, ModuleEntry>,
}

/// Names whose flags changed and that still need a refresh.
#[derive(Debug, Default)]
struct PendingQueue {
    names: Mutex<Vec<String>>,
}

impl PendingQueue {
    /// Returns `false` when `name` was already waiting.
    fn push(&self, name: &str) -> bool {
        let mut names = self.names.lock();
        if names.iter().any(|n| n == name) {
            return false;
        }
        names.push(name.to_owned());
        trace!(module = name, "Refresh queued");
        true
    }

    fn take(&self) -> Vec<String> {
        mem::take(&mut *self.names.lock())
    }

    fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }
}

/// The internal shared state of a [`Registry`].
#[derive(Debug)]
pub struct RegistryInner {
    flags: FlagStore,
    bus: EventBus,
    modules: RwLock<ModuleTable>,
    pending: PendingQueue,
    /// Serializes boot and stop transitions.
    lifecycle: tokio::sync::Mutex<()>,
}

/// Turns enablement flags into running or stopped module instances.
///
/// Flag watchers are synchronous while module transitions are async, so a watcher queues
/// the module name and spawns a [`reconcile`](Self::reconcile) on the current Tokio
/// runtime. Lifecycle passes ([`boot_all`](Self::boot_all), [`stop_all`](Self::stop_all),
/// [`set_enabled`](Self::set_enabled), [`reconcile`](Self::reconcile)) drain that queue
/// while holding the lifecycle lock.
///
/// A module's init may call [`set_enabled`](Self::set_enabled) or
/// [`reconcile`](Self::reconcile); the pass already running picks up the queued work.
/// Awaiting [`boot_all`](Self::boot_all) or [`stop_all`](Self::stop_all) from inside an
/// init deadlocks.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Deref for Registry {
    type Target = RegistryInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Registry {
    #[must_use]
    pub fn new(flags: FlagStore, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                flags,
                bus,
                modules: RwLock::new(ModuleTable::default()),
                pending: PendingQueue::default(),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Registers a module, or updates the one already registered under `name`.
    ///
    /// An update replaces `meta` and `init` only when they are given and leaves the run
    /// state and flag watchers alone. A new module starts stopped, with one watcher on its
    /// canonical key and one on its alternate key when that differs.
    pub fn register(&self, name: &str, meta: Option<ModuleMeta>, init: Option<InitFn>) {
        let mut table = self.modules.write();

        if let Some(entry) = table.entries.get_mut(name) {
            if let Some(meta) = meta {
                entry.meta = meta;
            }
            if init.is_some() {
                entry.init = init;
            }
            debug!(module = name, "Module re-registered");
            return;
        }

        let keys = derive_keys(name);
        let mut watches = vec![self.flags.watch(&keys.canonical, self.queue_refresh(name))];
        if keys.has_distinct_alternate() {
            watches.push(self.flags.watch(&keys.alternate, self.queue_refresh(name)));
        }

        debug!(module = name, key = %keys.canonical, alt = %keys.alternate, "Module registered");
        table.order.push(name.to_owned());
        table.entries.insert(
            name.to_owned(),
            ModuleEntry {
                meta: meta.unwrap_or_default(),
                init,
                keys,
                booted: false,
                disposer: Mutex::new(Disposer::None),
                _watches: watches,
            },
        );
    }

    /// Boots or stops `name` so that it matches its effective enabled state.
    pub async fn refresh(&self, name: &str) {
        let lock = self.lifecycle.lock().await;
        self.refresh_locked(name).await;
        self.finish(lock).await;
    }

    /// Runs the init of `name`. Returns `false` if the module is unknown, already booted,
    /// has no init, or its init failed.
    pub async fn boot_one(&self, name: &str) -> bool {
        let lock = self.lifecycle.lock().await;
        let booted = self.boot_locked(name).await;
        self.finish(lock).await;
        booted
    }

    /// Runs the disposer of `name`. Returns `false` if the module is unknown or not booted.
    ///
    /// A failing disposer is reported, but the module still ends up stopped.
    pub async fn stop_one(&self, name: &str) -> bool {
        let lock = self.lifecycle.lock().await;
        let stopped = self.stop_locked(name).await;
        self.finish(lock).await;
        stopped
    }

    /// Boots every effectively enabled module in registration order.
    ///
    /// Returns how many modules were booted by this call.
    pub async fn boot_all(&self) -> usize {
        let lock = self.lifecycle.lock().await;
        let mut booted = 0;
        for name in self.names() {
            if self.is_effectively_enabled(&name) && self.boot_locked(&name).await {
                booted += 1;
            }
        }
        self.finish(lock).await;
        booted
    }

    /// Stops every booted module in registration order, awaiting each disposer before
    /// moving on.
    ///
    /// Returns how many modules were stopped by this call.
    pub async fn stop_all(&self) -> usize {
        let lock = self.lifecycle.lock().await;
        let mut stopped = 0;
        for name in self.names() {
            if self.stop_locked(&name).await {
                stopped += 1;
            }
        }
        self.finish(lock).await;
        stopped
    }

    /// Writes `enabled` to both flag keys of `name` and applies the resulting transition.
    ///
    /// Returns `false` for an unknown module.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let Some(keys) = self.keys(name) else {
            debug!(module = name, "set_enabled on unknown module");
            return false;
        };

        self.flags.set(&keys.canonical, Value::Bool(enabled)).await;
        if keys.has_distinct_alternate() {
            self.flags.set(&keys.alternate, Value::Bool(enabled)).await;
        }
        self.reconcile().await;
        true
    }

    /// Applies queued refreshes. Flag watchers spawn this on every change; awaiting it
    /// directly makes the outcome of a flag write observable right away.
    ///
    /// Returns immediately when a lifecycle pass is running; that pass drains the queue.
    pub async fn reconcile(&self) {
        loop {
            let Ok(lock) = self.lifecycle.try_lock() else {
                return;
            };
            self.drain_locked().await;
            drop(lock);
            if self.pending.is_empty() {
                return;
            }
        }
    }

    /// Snapshot of every module in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<ModuleSnapshot> {
        let table = self.modules.read();
        table
            .order
            .iter()
            .filter_map(|name| table.entries.get(name).map(|entry| entry.snapshot(name)))
            .collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ModuleSnapshot> {
        self.modules.read().entries.get(name).map(|entry| entry.snapshot(name))
    }

    #[must_use]
    pub fn is_booted(&self, name: &str) -> bool {
        self.modules.read().entries.get(name).is_some_and(|entry| entry.booted)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `name` should be running: its canonical key, defaulting to the module's
    /// `enabled_by_default`, or its alternate key, defaulting to off.
    #[must_use]
    pub fn is_effectively_enabled(&self, name: &str) -> bool {
        let table = self.modules.read();
        let Some(entry) = table.entries.get(name) else {
            return false;
        };
        self.flags.is_on(&entry.keys.canonical, entry.meta.enabled_by_default)
            || self.flags.is_on(&entry.keys.alternate, false)
    }

    #[must_use]
    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    fn keys(&self, name: &str) -> Option<FlagKeys> {
        self.modules.read().entries.get(name).map(|entry| entry.keys.clone())
    }

    fn names(&self) -> Vec<String> {
        self.modules.read().order.clone()
    }

    fn queue_refresh(&self, name: &str) -> impl Fn(&Value) + Send + Sync + 'static {
        let weak = Arc::downgrade(&self.inner);
        let name = name.to_owned();
        move |_| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.pending.push(&name) {
                spawn_reconcile(Arc::downgrade(&inner));
            }
        }
    }

    /// Drains the queue, releases the lifecycle lock, then picks up anything queued in
    /// between.
    async fn finish(&self, lock: MutexGuard<'_, ()>) {
        self.drain_locked().await;
        drop(lock);
        if !self.pending.is_empty() {
            self.reconcile().await;
        }
    }

    async fn drain_locked(&self) {
        loop {
            let names = self.pending.take();
            if names.is_empty() {
                break;
            }
            for name in names {
                self.refresh_locked(&name).await;
            }
        }
    }

    async fn refresh_locked(&self, name: &str) {
        let wanted = self.is_effectively_enabled(name);
        match (wanted, self.is_booted(name)) {
            (true, false) => {
                self.boot_locked(name).await;
            },
            (false, true) => {
                self.stop_locked(name).await;
            },
            _ => trace!(module = name, running = wanted, "Module already in place"),
        }
    }

    async fn boot_locked(&self, name: &str) -> bool {
        let init = {
            let table = self.modules.read();
            match table.entries.get(name) {
                Some(entry) if !entry.booted => entry.init.clone(),
                _ => return false,
            }
        };
        let Some(init) = init else {
            debug!(module = name, "Module has no init; not booting");
            return false;
        };

        info!(module = name, "Booting module");
        let label = format!("init:{name}");
        let Some(disposer) = guard(Some(&self.bus), &label, init()).await else {
            return false;
        };

        if let Some(entry) = self.modules.write().entries.get_mut(name) {
            entry.booted = true;
            *entry.disposer.get_mut() = disposer;
        }
        self.bus.emit(MODULE_STARTED, json!({ "name": name }));
        true
    }

    async fn stop_locked(&self, name: &str) -> bool {
        let disposer = {
            let mut table = self.modules.write();
            match table.entries.get_mut(name) {
                Some(entry) if entry.booted => {
                    entry.booted = false;
                    mem::take(entry.disposer.get_mut())
                },
                _ => return false,
            }
        };

        info!(module = name, "Stopping module");
        let label = format!("stop:{name}");
        guard(Some(&self.bus), &label, disposer.run()).await;
        self.bus.emit(MODULE_STOPPED, json!({ "name": name }));
        true
    }
}

/// Outside a Tokio runtime the name stays queued for the next lifecycle pass.
fn spawn_reconcile(weak: Weak<RegistryInner>) {
    let Ok(handle) = Handle::try_current() else {
        trace!("No runtime to reconcile on; refresh stays queued");
        return;
    };
    handle.spawn(async move {
        if let Some(inner) = weak.upgrade() {
            Registry { inner }.reconcile().await;
        }
    });
}
