//! Module registry.
//!
//! A module is a named unit with metadata, an async init and whatever [`Disposer`] that
//! init hands back. Whether it runs is decided by two flags, see
//! [`derive_keys`]. The [`Registry`] watches both and boots or stops the module to match.
//! Disposers are async; implement [`Dispose`] with [`async_trait`].
//!
//! ```rust
//! use veneer_event_bus::EventBus;
//! use veneer_flags::FlagStore;
//! use veneer_kernel::prelude::ModuleMeta;
//! use veneer_modules::{Registry, init_fn};
//! use veneer_storage::KvStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new();
//! let flags = FlagStore::with_bus(KvStore::with_memory("veneer").unwrap(), bus.clone());
//! flags.init(Default::default()).await;
//!
//! let registry = Registry::new(flags, bus);
//! let meta = ModuleMeta::new("Demo Badge").enabled_by_default(true);
//! registry.register("DemoBadge", Some(meta), Some(init_fn(|| async { Ok(()) })));
//!
//! assert_eq!(registry.boot_all().await, 1);
//! registry.set_enabled("DemoBadge", false).await;
//! assert!(!registry.is_booted("DemoBadge"));
//! # }
//! ```

mod disposer;
mod registry;

pub use async_trait::async_trait;
pub use disposer::{Dispose, Disposer, InitFn, init_fn};
pub use registry::{ModuleSnapshot, Registry, RegistryInner};
pub use veneer_domain::keys::{FlagKeys, derive_keys, slug};
