//! Dual-tier key-value persistence.
//!
//! Every value lives under a namespaced key (`<namespace>:<key>`) in two places:
//!
//! - **Durable tier**: any [`DurableBackend`]. It is async and may be slow or fail. Two
//!   implementations ship here: [`MemoryBackend`] and the file-backed [`FileBackend`].
//! - **Local mirror**: a synchronous [`LocalMirror`] that answers early reads before the
//!   durable tier is loaded, and stands in when no durable tier exists.
//!
//! [`KvStore`] ties the two together and never surfaces errors to callers: failed reads
//! yield the caller's default, failed writes are logged.
//!
//! # File backend
//!
//! - **Atomic Writes**: unique temp write + `fsync` + `rename`, so a crash never leaves a
//!   torn record.
//! - **Transparent Compression**: optional LZ4 block compression.
//! - **Self-Healing**: orphaned temporary files are purged when the backend connects.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use std::sync::Arc;
//! use veneer_storage::{Compression, FileBackend, KvStore, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let backend = FileBackend::builder()
//!         .root(tmp.path().join("data"))
//!         .compression(Compression::Lz4)
//!         .connect()
//!         .await?;
//!
//!     let store = KvStore::new("veneer", Some(Arc::new(backend)))?;
//!     store.set("mod:demo:settings", json!({ "color": "red" })).await;
//!
//!     let settings = store.get("mod:demo:settings", json!({})).await;
//!     assert_eq!(settings["color"], "red");
//!     Ok(())
//! }
//! ```

mod backend;
mod builder;
mod error;
mod file;
mod maintenance;
mod mirror;
mod namespace;
mod store;

pub use backend::{DurableBackend, MemoryBackend};
pub use builder::FileBackendBuilder;
pub use error::{StorageError, StorageErrorExt};
pub use file::{Compression, FileBackend};
pub use mirror::LocalMirror;
pub use namespace::Namespace;
pub use store::KvStore;
