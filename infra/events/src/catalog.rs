//! Event names shared across the runtime.

use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Events that may also arrive from the host's native channel.
///
/// The bridge listens for exactly these names; anything else stays bus-internal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum WellKnownEvent {
    FlagsUpdated,
    OpenHideManager,
    OpenTextreplacerManager,
    OpenHiddenWorksImportExport,
}

impl WellKnownEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Emitted once after the flag store is ready, with `{version}`.
pub const CORE_READY: &str = "core:ready";
/// A module booted, with `{name}`.
pub const MODULE_STARTED: &str = "module:started";
/// A module stopped, with `{name}`.
pub const MODULE_STOPPED: &str = "module:stopped";
/// A settings record changed, with `{module, value}`.
pub const SETTINGS_CHANGED: &str = "settings:changed";
/// A guarded lifecycle step failed, with `{label, error}`.
pub const ERROR: &str = "error";

/// Payload field marking an event that the bus itself relayed to the native channel.
pub const RELAY_MARKER: &str = "__fromBus";

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn catalog_names_are_kebab_case() {
        let names: Vec<_> = WellKnownEvent::iter().map(WellKnownEvent::as_str).collect();
        assert_eq!(
            names,
            [
                "flags-updated",
                "open-hide-manager",
                "open-textreplacer-manager",
                "open-hidden-works-import-export",
            ]
        );
    }

    #[test]
    fn catalog_parses_from_wire_names() {
        assert_eq!(WellKnownEvent::from_str("flags-updated").ok(), Some(WellKnownEvent::FlagsUpdated));
        assert!(WellKnownEvent::from_str("module:started").is_err());
    }
}
