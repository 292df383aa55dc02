//! Scalar extraction from loosely structured JSON input

use serde_json::Value;

/// First scalar found in `value`, depth-first, rendered as a string.
///
/// Strings are returned as-is, numbers and booleans in their JSON spelling.
/// `null` and containers without any scalar yield `None`.
pub fn find_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(find_scalar),
        Value::Object(map) => map.values().find_map(find_scalar),
    }
}

/// Like [`find_scalar`], for raw text that may hold JSON-encoded structure.
///
/// Text that does not decode to a JSON array or object is kept verbatim.
pub fn find_scalar_in_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return find_scalar(&value);
        }
    }
    Some(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_pass_through() {
        assert_eq!(find_scalar(&json!("en")), Some("en".into()));
        assert_eq!(find_scalar(&json!(3)), Some("3".into()));
        assert_eq!(find_scalar(&json!(true)), Some("true".into()));
        assert_eq!(find_scalar(&Value::Null), None);
    }

    #[test]
    fn nested_values_downgrade_to_first_scalar() {
        assert_eq!(find_scalar(&json!(["nl", "en"])), Some("nl".into()));
        assert_eq!(find_scalar(&json!([[], [null, "de"]])), Some("de".into()));
        assert_eq!(find_scalar(&json!({"value": {"code": "fr"}})), Some("fr".into()));
        assert_eq!(find_scalar(&json!({"a": [], "b": {}})), None);
    }

    #[test]
    fn encoded_text_is_decoded() {
        assert_eq!(find_scalar_in_str(r#"["pt_BR"]"#), Some("pt_BR".into()));
        assert_eq!(find_scalar_in_str("[]"), None);
        assert_eq!(find_scalar_in_str("en"), Some("en".into()));
        assert_eq!(find_scalar_in_str("[not json"), Some("[not json".into()));
    }
}
