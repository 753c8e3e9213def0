use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

/// Fast synchronous local tier.
///
/// Entries are kept as serialized JSON text, the way a string-only local store holds
/// them, so a value that cannot be decoded reads back as the caller's default. The
/// mirror is advisory: it answers early reads before the durable tier is loaded and
/// stands in when no durable tier exists.
#[derive(Debug, Default)]
pub struct LocalMirror {
    entries: RwLock<FxHashMap<String, String>>,
}

impl LocalMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str, default: Value) -> Value {
        let entries = self.entries.read();
        let Some(raw) = entries.get(key) else {
            return default;
        };
        serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!(key, error = %err, "Unreadable mirror entry; using default");
            default
        })
    }

    pub fn set(&self, key: &str, value: &Value) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                self.entries.write().insert(key.to_owned(), raw);
            },
            Err(err) => warn!(key, error = %err, "Failed to encode mirror entry"),
        }
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Stores raw text as-is; used to seed the mirror from a host's local storage.
    pub fn set_raw(&self, key: &str, raw: impl Into<String>) {
        self.entries.write().insert(key.to_owned(), raw.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn corrupted_entries_fall_back_to_default() {
        let mirror = LocalMirror::new();
        mirror.set_raw("veneer:flags", "{not json");
        assert_eq!(mirror.get("veneer:flags", json!({})), json!({}));
    }

    #[test]
    fn delete_removes_entry() {
        let mirror = LocalMirror::new();
        mirror.set("k", &json!([1, 2]));
        assert_eq!(mirror.get("k", Value::Null), json!([1, 2]));
        mirror.delete("k");
        assert!(!mirror.contains("k"));
        assert_eq!(mirror.get("k", Value::Null), Value::Null);
    }
}
