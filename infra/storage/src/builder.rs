use crate::error::{StorageError, StorageErrorExt};
use crate::file::{Compression, FileBackend, FileBackendInner};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone)]
struct FileBackendConfig {
    compression: Compression,
    create: bool,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self { compression: Compression::None, create: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct FileBackendBuilder<S: Sealed = NoRoot> {
    state: S,
    config: FileBackendConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> FileBackendBuilder<S> {
    #[must_use = "Sets compression for stored records"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    #[must_use = "Sets whether the root directory should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> FileBackendBuilder<N> {
        FileBackendBuilder { state, config: self.config }
    }
}

impl FileBackendBuilder<NoRoot> {
    #[must_use = "Creates a new file backend builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the directory holding every record"]
    pub fn root(self, path: impl Into<PathBuf>) -> FileBackendBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl FileBackendBuilder<WithRoot> {
    /// Consumes the configuration and opens the backend.
    ///
    /// 1. Creates the root directory when `create(true)` (the default) was set.
    /// 2. Canonicalizes the root.
    /// 3. Purges temporary files orphaned by an earlier crash. Cleanup failures are only
    ///    logged.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryNotFound`] when the root is missing and `create`
    /// is false, and [`StorageError::Io`] when the root cannot be created or resolved.
    pub async fn connect(self) -> Result<FileBackend, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap store root: {}", root.display()))?;
            info!(path = %root.display(), "Bootstrapped store root directory");
        } else if !fs::try_exists(root).await.unwrap_or(false) {
            return Err(StorageError::DirectoryNotFound {
                message: root.display().to_string().into(),
                context: Some("Store root is missing and creation is disabled".into()),
            });
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve store root: {}", root.display()))?;

        let backend = FileBackend {
            inner: Arc::new(FileBackendInner {
                root: canonical,
                compression: self.config.compression,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        backend.purge_tmp().await;

        Ok(backend)
    }
}
