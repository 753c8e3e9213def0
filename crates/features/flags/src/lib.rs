//! Flag store slice: the persisted flag mapping that drives module enablement.
//!
//! Flags are a flat JSON object persisted under the `flags` key. A flag is "on" when its
//! value is truthy (see [`veneer_domain::value::is_truthy`]).

mod store;
mod watch;

pub use store::{FlagState, FlagStore, FlagStoreInner, same_value};
pub use watch::{WatchHandle, Watcher};
