//! Common imports for the runtime slices.

pub use crate::guard::guard;
pub use veneer_domain::config::VeneerConfig;
pub use veneer_domain::constants::{DEFAULT_NAMESPACE, FLAGS_KEY, VERSION};
pub use veneer_domain::module::ModuleMeta;
pub use veneer_domain::value::is_truthy;
pub use veneer_domain::{Record, Value};
pub use veneer_event_bus::EventBus;
