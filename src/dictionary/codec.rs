//! Key renaming transform
//!
//! One function serves both directions: pass `deflate` to compress and
//! `inflate` to restore.

use serde_json::{Map, Value};

use super::KeyMap;

/// Rename object keys in `value` according to `mapping`, at every depth.
///
/// Scalars and `null` are returned unchanged. Arrays are mapped element by
/// element. Object keys found in `mapping` are replaced; values are
/// transformed recursively.
pub fn transform(value: &Value, mapping: &KeyMap) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| transform(v, mapping)).collect()),
        Value::Object(fields) => {
            let mut renamed = Map::with_capacity(fields.len());
            for (key, inner) in fields {
                let name = mapping.get(key).unwrap_or(key);
                // Later duplicates overwrite earlier ones.
                renamed.insert(name.clone(), transform(inner, mapping));
            }
            Value::Object(renamed)
        }
        scalar => scalar.clone(),
    }
}
