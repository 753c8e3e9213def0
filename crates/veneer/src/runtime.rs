use crate::error::VeneerError;
use serde_json::json;
use std::ops::Deref;
use std::sync::Arc;
use tracing::info;
use veneer_domain::config::{StorageCompression, VeneerConfig};
use veneer_domain::constants::VERSION;
use veneer_event_bus::{CORE_READY, EventBus, NativeChannel};
use veneer_flags::FlagStore;
use veneer_kernel::prelude::Record;
use veneer_modules::Registry;
use veneer_settings::Settings;
use veneer_storage::{Compression, DurableBackend, FileBackend, KvStore, MemoryBackend};

/// The internal shared state of a [`Runtime`].
#[derive(Debug)]
pub struct RuntimeInner {
    config: VeneerConfig,
    store: KvStore,
    bus: EventBus,
    flags: FlagStore,
    settings: Settings,
    registry: Registry,
}

/// Every runtime component, built once and shared by handle.
#[derive(Debug, Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Deref for Runtime {
    type Target = RuntimeInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Runtime {
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Initializes flags, announces `core:ready` and boots every enabled module.
    ///
    /// `defaults` are layered over the configured `flags` defaults; persisted values still
    /// win over both. Returns how many modules were booted.
    pub async fn boot(&self, defaults: Record) -> usize {
        let mut merged = self.config.flags.clone();
        merged.extend(defaults);
        self.flags.init(merged).await;

        self.bus.emit(CORE_READY, json!({ "version": VERSION }));
        let booted = self.registry.boot_all().await;
        info!(version = VERSION, booted, "Core ready");

        for module in self.registry.all() {
            info!(
                module = %module.name,
                key = %module.enabled_key,
                alt = %module.enabled_key_alt,
                booted = module.booted,
                "Module registered"
            );
        }
        booted
    }

    /// Stops every booted module and drops all bus handlers.
    pub async fn shutdown(&self) -> usize {
        let stopped = self.registry.stop_all().await;
        let handlers = self.bus.shutdown();
        info!(stopped, handlers, "Runtime shut down");
        stopped
    }

    #[must_use]
    pub fn config(&self) -> &VeneerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &KvStore {
        &self.store
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn modules(&self) -> &Registry {
        &self.registry
    }
}

/// Assembles a [`Runtime`] from a [`VeneerConfig`].
///
/// The durable tier is chosen in this order: an explicit [`durable`](Self::durable)
/// backend, a [`FileBackend`] under `storage.data_dir`, then an in-memory backend.
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config: VeneerConfig,
    durable: Option<Arc<dyn DurableBackend>>,
    native: Option<Arc<dyn NativeChannel>>,
}

impl RuntimeBuilder {
    #[must_use = "Sets the configuration the runtime is built from"]
    pub fn config(mut self, config: VeneerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "Overrides the durable tier"]
    pub fn durable(mut self, backend: Arc<dyn DurableBackend>) -> Self {
        self.durable = Some(backend);
        self
    }

    /// Bridges the bus to the host's broadcast primitive.
    #[must_use = "Attaches a native broadcast channel"]
    pub fn native(mut self, channel: Arc<dyn NativeChannel>) -> Self {
        self.native = Some(channel);
        self
    }

    /// # Errors
    /// Returns [`VeneerError`] for an invalid namespace, an unusable data directory, a zero
    /// tap capacity, or a native channel that refuses listeners.
    pub async fn build(self) -> Result<Runtime, VeneerError> {
        let config = self.config;

        let durable: Arc<dyn DurableBackend> = match (self.durable, &config.storage.data_dir) {
            (Some(backend), _) => backend,
            (None, Some(dir)) => {
                let compression = match config.storage.compression {
                    StorageCompression::None => Compression::None,
                    StorageCompression::Lz4 => Compression::Lz4,
                };
                Arc::new(FileBackend::builder().root(dir).compression(compression).connect().await?)
            },
            (None, None) => Arc::new(MemoryBackend::new()),
        };

        let store = KvStore::new(config.namespace.as_str(), Some(durable))?;
        let bus = EventBus::builder()
            .namespace(config.namespace.clone())
            .relay(config.bus.relay)
            .tap_capacity(config.bus.tap_capacity)
            .build()?;

        if let Some(channel) = self.native {
            let names = bus.bridge(channel)?;
            info!(names, "Native channel bridged");
        }

        let flags = FlagStore::with_bus(store.clone(), bus.clone());
        let settings = Settings::new(store.clone(), bus.clone());
        let registry = Registry::new(flags.clone(), bus.clone());

        info!(namespace = %config.namespace, durable = store.has_durable(), "Runtime assembled");
        Ok(Runtime { inner: Arc::new(RuntimeInner { config, store, bus, flags, settings, registry }) })
    }
}
