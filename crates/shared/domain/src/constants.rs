/// Default key namespace for every persisted entry (`<namespace>:<key>`).
pub const DEFAULT_NAMESPACE: &str = "veneer";

/// Durable record holding the whole flag mapping.
pub const FLAGS_KEY: &str = "flags";

/// Runtime version announced with `core:ready`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
