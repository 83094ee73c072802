//! Helpers for walking parsed YAML nodes
//!
//! The parser and plugins hand-walk `serde_yaml` values so that schema
//! violations can be reported with the path of the offending node.

use serde_yaml::{Mapping, Value};

/// Render a scalar node as a string, accepting strings, numbers, and bools.
pub fn scalar_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract an integer from a scalar node, accepting quoted integers.
pub fn scalar_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a boolean from a scalar node, accepting quoted booleans.
pub fn scalar_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A mapping key as a string slice, if it is one.
pub fn key_str(v: &Value) -> Option<&str> {
    v.as_str()
}

/// True if the mapping contains the given string key.
pub fn has_key(m: &Mapping, key: &str) -> bool {
    m.contains_key(key)
}

/// Path of a child node under `at`, for error annotation.
pub fn child(at: &str, key: &str) -> String {
    if at.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", at, key)
    }
}

/// Path of a sequence element under `at`.
pub fn elem(at: &str, index: usize) -> String {
    format!("{}[{}]", at, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_str() {
        assert_eq!(
            scalar_str(&Value::String("cat".into())),
            Some("cat".to_string())
        );
        assert_eq!(scalar_str(&serde_yaml::from_str("3").unwrap()), Some("3".to_string()));
        assert_eq!(scalar_str(&Value::Null), None);
    }

    #[test]
    fn test_scalar_i64_quoted() {
        assert_eq!(scalar_i64(&Value::String("42".into())), Some(42));
        assert_eq!(scalar_i64(&serde_yaml::from_str("42").unwrap()), Some(42));
        assert_eq!(scalar_i64(&Value::String("nope".into())), None);
    }

    #[test]
    fn test_paths() {
        assert_eq!(child("tests[0]", "timeout"), "tests[0].timeout");
        assert_eq!(child("", "defaults"), "defaults");
        assert_eq!(elem("tests", 2), "tests[2]");
    }
}
