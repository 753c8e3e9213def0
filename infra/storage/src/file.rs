//! File-backed durable tier.
//!
//! Every record is one JSON document under the backend root. The file name is the hex
//! encoding of the namespaced key, so arbitrary keys (`veneer:mod:Save Scroll:settings`)
//! map to safe, flat, collision-free names without any path resolution.

use crate::backend::DurableBackend;
use crate::builder::FileBackendBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use async_trait::async_trait;
use serde_json::Value;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const RECORD_SUFFIX: &str = "json";
pub(crate) const TMP_MARKER: &str = ".veneertmp.";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    #[must_use]
    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    fn decompress(self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data.to_vec()),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(data).context("Lz4 decompression failed")
            },
        }
    }
}

/// The internal shared state of a [`FileBackend`].
#[derive(Debug)]
pub struct FileBackendInner {
    /// The canonicalized directory holding every record.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    /// Source of unique temporary file names.
    pub(crate) tmp_counter: AtomicU64,
}

/// Durable tier writing one atomically-replaced file per key.
///
/// Writes go to a unique temporary file, are `fsync`ed and then renamed over the target,
/// so a crash never leaves a half-written record behind. Stale temporary files from an
/// earlier crash are purged on [`connect`](FileBackendBuilder::connect).
///
/// # Example
///
/// ```rust
/// use veneer_storage::{Compression, DurableBackend, FileBackend, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let backend = FileBackend::builder()
///         .root(tmp.path().join("store"))
///         .compression(Compression::Lz4)
///         .connect()
///         .await?;
///
///     backend.store("veneer:flags", &serde_json::json!({ "ui:dark": true })).await?;
///     let flags = backend.load("veneer:flags").await?;
///     assert_eq!(flags, Some(serde_json::json!({ "ui:dark": true })));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    pub(crate) inner: Arc<FileBackendInner>,
}

impl Deref for FileBackend {
    type Target = FileBackendInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FileBackend {
    #[must_use = "The backend is not initialized until you call .connect()"]
    pub fn builder() -> FileBackendBuilder {
        FileBackendBuilder::new()
    }

    /// Physical location of the record stored under `key`.
    #[must_use]
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{RECORD_SUFFIX}", hex::encode(key.as_bytes())))
    }

    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root).await;
    }

    async fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp = unique_tmp_path(target, &self.tmp_counter);
        let payload = self.compression.compress(data);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&payload).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, target).await {
            if err.kind() != std::io::ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), target.display())
                            .into(),
                    ),
                });
            }
            fs::remove_file(target)
                .await
                .context(format!("Failed to replace existing record: {}", target.display()))?;
            fs::rename(&temp, target).await.context(format!(
                "Atomic swap failed: {} -> {}",
                temp.display(),
                target.display()
            ))?;
        }

        sync_dir(&self.root).await;
        Ok(())
    }
}

#[async_trait]
impl DurableBackend for FileBackend {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.record_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", path.display()).into()),
                });
            },
        };

        let data = self.compression.decompress(&raw)?;
        let value = serde_json::from_slice(&data).context(format!("Corrupted record: {key}"))?;
        Ok(Some(value))
    }

    async fn store(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let path = self.record_path(key);
        let data = serde_json::to_vec(value).context(format!("Failed to encode record: {key}"))?;
        self.write_atomic(&path, &data).await?;
        debug!(key, path = %path.display(), "Record saved atomically");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.record_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Record deleted");
                Ok(())
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", path.display()).into()),
            }),
        }
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("record");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{counter}"))
}
