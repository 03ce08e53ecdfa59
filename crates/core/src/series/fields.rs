//! Dot-path helpers for nested JSON documents.

use serde_json::{Map, Value};

/// List every leaf field of `doc` as a dot-joined path.
///
/// Descends into nested objects only; arrays and scalars are leaves.
/// Paths come out in map iteration order.
pub fn discover_field_paths(doc: &Map<String, Value>) -> Vec<String> {
    let mut fields = Vec::new();
    let mut prefix = Vec::new();
    walk(doc, &mut prefix, &mut fields);
    fields
}

fn walk<'a>(obj: &'a Map<String, Value>, prefix: &mut Vec<&'a str>, fields: &mut Vec<String>) {
    for (key, value) in obj {
        match value {
            Value::Object(nested) => {
                prefix.push(key);
                walk(nested, prefix, fields);
                prefix.pop();
            }
            _ => {
                let mut path = prefix.join(".");
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
                fields.push(path);
            }
        }
    }
}

/// Look up a dot-separated path. Returns `None` when any segment is
/// missing, an intermediate value is not an object, or the leaf is null.
pub fn pluck_deep<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut value = doc.get(first)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    (!value.is_null()).then_some(value)
}
