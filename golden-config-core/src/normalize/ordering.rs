//! Order canonicalization for rules that declare order irrelevant.

use serde_json::Value;

use super::content::canonical_json;

/// Recursively sort every sequence by the canonical text of its items.
///
/// Two documents that differ only in list ordering canonicalize to the same
/// value. Mappings are already key-ordered.
pub fn canonicalize_unordered(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut keyed: Vec<(String, Value)> = items
                .iter()
                .map(canonicalize_unordered)
                .map(|item| (canonical_json(&item), item))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Array(keyed.into_iter().map(|(_, item)| item).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonicalize_unordered(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
