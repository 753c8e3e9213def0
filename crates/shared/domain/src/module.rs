use crate::Record;
use serde::{Deserialize, Serialize};

/// Descriptive metadata a module registers with.
///
/// Unknown fields are preserved in `extra` so collaborators (menus, diagnostics) can carry
/// their own hints without this crate knowing about them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleMeta {
    pub title: String,
    pub enabled_by_default: bool,
    pub group: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl ModuleMeta {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    #[must_use]
    pub const fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}
