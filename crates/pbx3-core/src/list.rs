// List-response normalization.
//
// Collection endpoints don't agree on a shape: some return a bare array,
// some wrap it in `data` or under the resource name, and PHP sometimes
// emits a sequential array as an object with numeric keys.

use serde_json::Value;

/// Flatten any list-shaped response into a `Vec`.
///
/// Tried in order: a bare array; an array under `data`; an array under
/// `key`; an object whose keys are all digits (values in numeric key
/// order). Anything else yields an empty list.
pub fn normalize_list(response: &Value, key: Option<&str>) -> Vec<Value> {
    match response {
        Value::Array(items) => items.clone(),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("data") {
                return items.clone();
            }
            if let Some(Value::Array(items)) = key.and_then(|k| map.get(k)) {
                return items.clone();
            }
            if map.keys().all(|k| is_index(k)) {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
                return entries.into_iter().map(|(_, v)| v.clone()).collect();
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}
