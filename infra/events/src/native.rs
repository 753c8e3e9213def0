use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, trace};

/// Callback invoked for every native broadcast under a listened name.
pub type NativeListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// The host's own broadcast/listen primitive.
///
/// Names arrive fully qualified (`<namespace>:<event>`). Implementations should deliver
/// every broadcast to every listener of that name, including listeners installed by the
/// bus itself; the relay marker keeps that from looping.
pub trait NativeChannel: Debug + Send + Sync {
    /// Broadcasts a payload under `name`.
    ///
    /// # Errors
    /// Returns an error when the host refuses the dispatch. The bus logs and ignores it.
    fn broadcast(&self, name: &str, payload: &Value) -> Result<(), EventBusError>;

    /// Installs a listener for `name`.
    ///
    /// # Errors
    /// Returns an error when the host cannot register listeners.
    fn listen(&self, name: &str, listener: NativeListener) -> Result<(), EventBusError>;
}

/// In-process [`NativeChannel`] that delivers synchronously on the broadcasting thread.
#[derive(Default)]
pub struct LoopbackChannel {
    listeners: RwLock<FxHashMap<String, Vec<NativeListener>>>,
    closed: AtomicBool,
}

impl Debug for LoopbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackChannel")
            .field("names", &self.listeners.read().len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl LoopbackChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every later broadcast and listen with [`EventBusError::ChannelClosed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map_or(0, Vec::len)
    }

    fn ensure_open(&self, name: &str) -> Result<(), EventBusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EventBusError::ChannelClosed {
                message: name.to_owned().into(),
                context: Some("Loopback channel".into()),
            });
        }
        Ok(())
    }
}

impl NativeChannel for LoopbackChannel {
    fn broadcast(&self, name: &str, payload: &Value) -> Result<(), EventBusError> {
        self.ensure_open(name)?;

        let listeners = self.listeners.read().get(name).cloned().unwrap_or_default();
        trace!(name, listeners = listeners.len(), "Loopback broadcast");

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(payload))).is_err() {
                error!(name, "Native listener panicked");
            }
        }
        Ok(())
    }

    fn listen(&self, name: &str, listener: NativeListener) -> Result<(), EventBusError> {
        self.ensure_open(name)?;
        self.listeners.write().entry(name.to_owned()).or_default().push(listener);
        Ok(())
    }
}
