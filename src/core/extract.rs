//! Field extraction from untyped provider JSON.
//!
//! OpenLibrary stores the same field in several shapes depending on the
//! record's age and editor: a plain string, a typed text object
//! (`{"type": "/type/text", "value": "..."}`), or a list of strings.
//! [`extract`] flattens all of them into one string and treats every other
//! shape as "no usable value".
//!
//! Lookup is one level deep: the key must be a direct child of the node
//! passed in. Nested objects are never searched.

use serde_json::Value;

/// Separator used when joining list values
pub const LIST_SEPARATOR: &str = ",";

/// Extract `key` from `node`.
///
/// Precedence for the located value:
/// 1. a string is returned as is
/// 2. an object with a string `value` child yields that string
/// 3. a list yields its string elements joined with `,` in order
///    (no string elements means not found)
/// 4. anything else is not found
pub fn extract(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("value").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => {
            let strings: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if strings.is_empty() {
                None
            } else {
                Some(strings.join(LIST_SEPARATOR))
            }
        }
        _ => None,
    }
}
