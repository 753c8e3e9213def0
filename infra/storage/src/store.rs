//! The dual-tier store consumed by flags and settings.

use crate::backend::{DurableBackend, MemoryBackend};
use crate::error::StorageError;
use crate::mirror::LocalMirror;
use crate::namespace::Namespace;
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{trace, warn};

/// The internal shared state of a [`KvStore`].
#[derive(Debug)]
pub struct KvStoreInner {
    namespace: Namespace,
    durable: Option<Arc<dyn DurableBackend>>,
    mirror: LocalMirror,
}

/// Namespaced key-value store over a durable tier and a synchronous local mirror.
///
/// Durable failures are logged and swallowed: reads fall back to the caller's default
/// and writes keep the previous mirror entry. No operation here returns an error once
/// the store is constructed.
///
/// Cheap to clone; all clones share both tiers.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use veneer_storage::{KvStore, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     let store = KvStore::with_memory("veneer")?;
///     store.set("flags", json!({ "ui:dark": true })).await;
///
///     assert_eq!(store.get("flags", json!({})).await, json!({ "ui:dark": true }));
///     assert_eq!(store.mirror_get("flags", json!({})), json!({ "ui:dark": true }));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct KvStore {
    inner: Arc<KvStoreInner>,
}

impl Deref for KvStore {
    type Target = KvStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl KvStore {
    /// Creates a store over an optional durable tier.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidNamespace`] if the namespace is empty or contains
    /// characters other than ASCII alphanumerics and underscores.
    pub fn new<N>(
        namespace: N,
        durable: Option<Arc<dyn DurableBackend>>,
    ) -> Result<Self, StorageError>
    where
        N: TryInto<Namespace, Error = StorageError>,
    {
        Ok(Self {
            inner: Arc::new(KvStoreInner {
                namespace: namespace.try_into()?,
                durable,
                mirror: LocalMirror::new(),
            }),
        })
    }

    /// Store whose durable tier is a fresh [`MemoryBackend`].
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidNamespace`] for an invalid namespace.
    pub fn with_memory<N>(namespace: N) -> Result<Self, StorageError>
    where
        N: TryInto<Namespace, Error = StorageError>,
    {
        Self::new(namespace, Some(Arc::new(MemoryBackend::new())))
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Whether a durable tier is configured; without one the mirror is authoritative.
    #[must_use]
    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Reads `key` from the durable tier, or from the mirror when there is none.
    ///
    /// Missing keys and backend failures both yield `default`.
    pub async fn get(&self, key: &str, default: Value) -> Value {
        let full = self.namespace.key(key);
        let Some(durable) = &self.durable else {
            return self.mirror.get(&full, default);
        };

        match durable.load(&full).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                warn!(key = %full, error = %err, "Durable read failed; using default");
                default
            },
        }
    }

    /// Writes `key` to both tiers and returns the value.
    ///
    /// The mirror only follows successful durable writes, so it never runs ahead of the
    /// durable tier.
    pub async fn set(&self, key: &str, value: Value) -> Value {
        let full = self.namespace.key(key);
        if let Some(durable) = &self.durable
            && let Err(err) = durable.store(&full, &value).await
        {
            warn!(key = %full, error = %err, "Durable write failed; keeping previous value");
            return value;
        }
        self.mirror.set(&full, &value);
        trace!(key = %full, "Stored");
        value
    }

    /// Removes `key` from both tiers.
    pub async fn delete(&self, key: &str) {
        let full = self.namespace.key(key);
        if let Some(durable) = &self.durable
            && let Err(err) = durable.remove(&full).await
        {
            warn!(key = %full, error = %err, "Durable delete failed");
        }
        self.mirror.delete(&full);
    }

    /// Synchronous best-effort read from the local mirror.
    #[must_use]
    pub fn mirror_get(&self, key: &str, default: Value) -> Value {
        self.mirror.get(&self.namespace.key(key), default)
    }

    /// Synchronous write to the local mirror only.
    pub fn mirror_set(&self, key: &str, value: &Value) {
        self.mirror.set(&self.namespace.key(key), value);
    }

    /// Synchronous delete from the local mirror only.
    pub fn mirror_delete(&self, key: &str) {
        self.mirror.delete(&self.namespace.key(key));
    }

    /// The underlying mirror, for hosts that seed it from their own local storage.
    #[must_use]
    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }
}
