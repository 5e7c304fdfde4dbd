use serde_json::{Map, Value};

/// A changed leaf: dotted path (array items by index), old value, new value.
pub(crate) type Change = (String, Value, Value);

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Collects leaf-level differences between two response bodies. Keys that
/// vanish from `current` are reported with a `null` new value.
pub(crate) fn diff_json(previous: &Value, current: &Value, path_prefix: &str, changes: &mut Vec<Change>) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = join(path_prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None if curr_val.is_object() => {
                        diff_json(&Value::Object(Map::new()), curr_val, &path, changes);
                    }
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
            for (key, prev_val) in prev_map {
                if !curr_map.contains_key(key) {
                    changes.push((join(path_prefix, key), prev_val.clone(), Value::Null));
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) if prev_arr.len() == curr_arr.len() => {
            for (i, (p, c)) in prev_arr.iter().zip(curr_arr).enumerate() {
                diff_json(p, c, &join(path_prefix, &i.to_string()), changes);
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}
