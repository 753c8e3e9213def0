use crate::error::StorageError;
use std::fmt;

/// Validated key prefix shared by every entry of one store.
///
/// Names are lowercased and must be non-empty ASCII alphanumerics or underscores, so the
/// `<namespace>:<key>` layout stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Prefixes a raw key: `flags` becomes `veneer:flags`.
    #[must_use]
    pub fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&str> for Namespace {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        let name = value.trim().to_lowercase();

        if name.is_empty() {
            return Err(StorageError::InvalidNamespace {
                message: "EMPTY".into(),
                context: Some("Namespace cannot be empty".into()),
            });
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StorageError::InvalidNamespace {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_lowercased_and_prefixes_keys() {
        let ns = Namespace::try_from(" AO3H ").unwrap();
        assert_eq!(ns.as_ref(), "ao3h");
        assert_eq!(ns.key("mod:Demo:settings"), "ao3h:mod:Demo:settings");
    }

    #[test]
    fn namespace_rejects_separators() {
        assert!(Namespace::try_from("").is_err());
        assert!(Namespace::try_from("a:b").is_err());
        assert!(Namespace::try_from("../x").is_err());
    }
}
