use crate::Value;

/// Whether a flag value counts as "on".
///
/// `null`, `false`, `0` and `""` are off; every other value, including empty arrays and
/// objects, is on.
///
/// ```rust
/// use serde_json::json;
/// use veneer_domain::value::is_truthy;
///
/// assert!(is_truthy(&json!("yes")));
/// assert!(is_truthy(&json!([])));
/// assert!(!is_truthy(&json!(0)));
/// ```
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
