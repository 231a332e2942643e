//! Value access and output formatting

use serde_json::Value;

/// Text emitted for a value in template output
///
/// Strings are verbatim, `null` is empty, containers are compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// `base.name`; anything but an object member is `null`
pub fn get_attr(base: &Value, name: &str) -> Value {
    match base {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// `base[index]` for object keys and array positions
pub fn get_index(base: &Value, index: &Value) -> Value {
    let found = match (base, index) {
        (Value::Object(map), Value::String(key)) => map.get(key),
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i)),
        _ => None,
    };
    found.cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_scalars() {
        assert_eq!(display_value(&json!("a <b>")), "a <b>");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_display_containers_as_json() {
        assert_eq!(display_value(&json!([1, "a"])), r#"[1,"a"]"#);
        assert_eq!(display_value(&json!({"k": null})), r#"{"k":null}"#);
    }

    #[test]
    fn test_access() {
        let value = json!({"user": {"name": "Ada"}, "tags": ["x", "y"]});
        assert_eq!(get_attr(&get_attr(&value, "user"), "name"), json!("Ada"));
        assert_eq!(get_attr(&value, "missing"), Value::Null);
        assert_eq!(get_attr(&json!("str"), "len"), Value::Null);
        assert_eq!(get_index(&value["tags"], &json!(1)), json!("y"));
        assert_eq!(get_index(&value["tags"], &json!(9)), Value::Null);
        assert_eq!(get_index(&value, &json!("user"))["name"], json!("Ada"));
        assert_eq!(get_index(&value["tags"], &json!(-1)), Value::Null);
    }
}
