use crate::Record;
use crate::constants::DEFAULT_NAMESPACE;
use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VeneerConfigInner {
    /// Prefix of every persisted key and of relayed native event names.
    pub namespace: String,
    pub storage: StorageConfig,
    pub bus: BusConfig,
    pub log: LogConfig,
    /// Built-in flag defaults merged under persisted overrides at boot.
    pub flags: Record,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct VeneerConfig {
    #[serde(flatten, default)]
    inner: Arc<VeneerConfigInner>,
}

impl Deref for VeneerConfig {
    type Target = VeneerConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for VeneerConfig {
    fn deref_mut(&mut self) -> &mut VeneerConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Durable tier configuration. Without a `data_dir` the durable tier lives in memory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub compression: StorageCompression,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageCompression {
    #[default]
    None,
    Lz4,
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Relay emitted events to the host's native broadcast channel when one is attached.
    pub relay: bool,
    /// Buffer of the async event tap.
    pub tap_capacity: usize,
}

/// Logger configuration, applied by the facade before boot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `veneer_modules=debug`.
    pub directives: Option<String>,
    pub console: bool,
    /// Rolling log files are written here when set.
    pub dir: Option<PathBuf>,
    /// Write file output as JSON lines.
    pub json: bool,
}

// --- Default ---

impl Default for VeneerConfigInner {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            storage: StorageConfig::default(),
            bus: BusConfig::default(),
            log: LogConfig::default(),
            flags: Record::new(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { relay: true, tap_capacity: 128 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), directives: None, console: true, dir: None, json: false }
    }
}
