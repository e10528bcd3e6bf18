//! Case conversion at the API boundary: request keys camelCase -> snake_case
//! (column names), response keys snake_case -> camelCase (client JSON).

use serde_json::{Map, Value};

/// "user_id" -> "userId", "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// "userId" -> "user_id", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert an object's keys camelCase -> snake_case in place. Shallow:
/// request bodies are flat field maps.
pub fn object_keys_to_snake_case(obj: &mut Map<String, Value>) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for k in keys {
        let snake = to_snake_case(&k);
        if snake != k {
            if let Some(v) = obj.remove(&k) {
                obj.insert(snake, v);
            }
        }
    }
}

/// Convert all object keys snake_case -> camelCase, recursing through
/// nested includes (objects and arrays of objects).
pub fn value_keys_to_camel_case(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for k in keys {
                let camel = to_camel_case(&k);
                if camel != k {
                    if let Some(v) = map.remove(&k) {
                        map.insert(camel, v);
                    }
                }
            }
            for (_, v) in map.iter_mut() {
                value_keys_to_camel_case(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                value_keys_to_camel_case(v);
            }
        }
        _ => {}
    }
}
