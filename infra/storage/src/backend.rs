use crate::error::StorageError;
use async_trait::async_trait;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt::Debug;

/// The slow, possibly cross-session durable tier.
///
/// Keys arrive fully namespaced. Implementations report failures honestly; the
/// [`KvStore`](crate::KvStore) on top is the layer that swallows them.
#[async_trait]
pub trait DurableBackend: Debug + Send + Sync {
    /// Loads a record, `Ok(None)` when the key was never written.
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn store(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Removes a record. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local durable tier.
///
/// Used by tests and by hosts that have no durable medium; it survives as long as the
/// backend value does.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<FxHashMap<String, Value>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Direct read that bypasses the async surface, for assertions.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.records.read().get(key).cloned()
    }
}

#[async_trait]
impl DurableBackend for MemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn store(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.records.write().insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().remove(key);
        Ok(())
    }
}
