//! Persisted key layout.
//!
//! A module is enabled through two flag keys: the canonical `mod:<name>:enabled` and the
//! alternate `mod:<slug>:enabled`. The alternate key lets flags written under a normalized
//! spelling (older builds, hand-edited stores, external tools) keep working after a module
//! is renamed or re-registered.

use serde::{Deserialize, Serialize};

/// Lowercase alphanumeric collapse of a module name.
///
/// Surrounding whitespace is trimmed, the rest is lowercased and every character outside
/// `[a-z0-9]` is dropped.
///
/// ```rust
/// use veneer_domain::keys::slug;
///
/// assert_eq!(slug("  Save Scroll "), "savescroll");
/// assert_eq!(slug("Check-For-Kudos"), "checkforkudos");
/// ```
#[must_use]
pub fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// The pair of flag keys controlling one module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagKeys {
    pub canonical: String,
    pub alternate: String,
}

impl FlagKeys {
    /// Whether the alternate key is a distinct entry worth watching.
    #[must_use]
    pub fn has_distinct_alternate(&self) -> bool {
        self.canonical != self.alternate
    }
}

/// Derives the canonical and alternate enablement keys for a module name.
///
/// ```rust
/// use veneer_domain::keys::derive_keys;
///
/// let keys = derive_keys("Save Scroll");
/// assert_eq!(keys.canonical, "mod:Save Scroll:enabled");
/// assert_eq!(keys.alternate, "mod:savescroll:enabled");
/// ```
#[must_use]
pub fn derive_keys(name: &str) -> FlagKeys {
    FlagKeys { canonical: format!("mod:{name}:enabled"), alternate: format!("mod:{}:enabled", slug(name)) }
}

/// Durable key of a module's settings record.
#[must_use]
pub fn settings_key(name: &str) -> String {
    format!("mod:{name}:settings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercase_names_share_both_keys() {
        let keys = derive_keys("widget");
        assert_eq!(keys.canonical, keys.alternate);
        assert!(!keys.has_distinct_alternate());
    }

    #[test]
    fn mixed_case_names_get_a_distinct_alternate() {
        let keys = derive_keys("Widget");
        assert_eq!(keys.alternate, "mod:widget:enabled");
        assert!(keys.has_distinct_alternate());
    }

    #[test]
    fn settings_key_keeps_the_exact_name() {
        assert_eq!(settings_key("Save Scroll"), "mod:Save Scroll:settings");
    }

    proptest! {
        #[test]
        fn slug_only_yields_lowercase_alphanumerics(name in "\\PC{0,32}") {
            let s = slug(&name);
            prop_assert!(s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }

        #[test]
        fn slug_is_idempotent(name in "\\PC{0,32}") {
            let once = slug(&name);
            prop_assert_eq!(slug(&once), once.clone());
        }

        #[test]
        fn canonical_key_embeds_the_exact_name(name in "[A-Za-z0-9 _-]{1,24}") {
            prop_assert_eq!(derive_keys(&name).canonical, format!("mod:{name}:enabled"));
        }
    }
}
