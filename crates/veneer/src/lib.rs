//! # Veneer
//!
//! Reactive module runtime. Independently authored modules are registered, toggled and
//! composed inside a long-lived host session without a restart.
//!
//! This crate only composes the slices:
//!
//! * [`storage`]: the dual-tier key-value store,
//! * [`event_bus`]: publish/subscribe with an optional native relay,
//! * [`flags`]: the persisted flag mapping and its watchers,
//! * [`settings`]: per-module settings records,
//! * [`modules`]: the registry that boots and stops modules from their flags.
//!
//! Construction can fail; nothing after it does. Persistence failures fall back to defaults,
//! and failing module inits or disposers are logged and announced as `error` events.
//!
//! ```rust
//! use veneer::Runtime;
//! use veneer::kernel::prelude::ModuleMeta;
//! use veneer::modules::init_fn;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), veneer::VeneerError> {
//! let runtime = Runtime::builder().build().await?;
//! runtime.modules().register(
//!     "DemoBadge",
//!     Some(ModuleMeta::new("Demo Badge").enabled_by_default(true)),
//!     Some(init_fn(|| async { Ok(()) })),
//! );
//!
//! assert_eq!(runtime.boot(Default::default()).await, 1);
//! # Ok(())
//! # }
//! ```

mod error;
mod logging;
mod runtime;

pub use error::{VeneerError, VeneerErrorExt};
pub use logging::init_logging;
pub use runtime::{Runtime, RuntimeBuilder, RuntimeInner};

pub use veneer_domain as domain;
pub use veneer_event_bus as event_bus;
pub use veneer_flags as flags;
pub use veneer_kernel as kernel;
pub use veneer_logger as logger;
pub use veneer_modules as modules;
pub use veneer_settings as settings;
pub use veneer_storage as storage;

/// Loads [`VeneerConfig`](domain::config::VeneerConfig) from `path` (or `veneer.*` in the
/// working directory) plus `VENEER__` environment overrides, and builds a runtime from it.
///
/// # Errors
/// Returns [`VeneerError::Config`] when the configuration cannot be loaded, or any error of
/// [`RuntimeBuilder::build`].
pub async fn from_config_file(
    path: Option<impl AsRef<std::path::Path>>,
) -> Result<Runtime, VeneerError> {
    let config = kernel::config::load_config(path)?;
    Runtime::builder().config(config).build().await
}
