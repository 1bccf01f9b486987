//! Helpers for comparing and shaping JSON values.

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// A decrypted table row keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Builds a JSON number, preferring an integer representation when exact.
#[must_use]
pub fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        #[allow(clippy::cast_possible_truncation)]
        return Value::from(n as i64);
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// Structural equality that treats `1` and `1.0` as equal.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

/// Compares two values of the same kind; `None` when kinds differ.
#[must_use]
pub fn partial_compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order used for sorting.
///
/// null < boolean < number < string < array/object, with arrays and objects
/// compared by their JSON text.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    };
    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => {
            partial_compare(a, b).unwrap_or_else(|| a.to_string().cmp(&b.to_string()))
        }
        ord => ord,
    }
}

/// Renders a value as plain text: strings without quotes, everything else as JSON.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds an order-independent identity key for structural deduplication.
#[must_use]
pub fn identity_key(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), |f| number(f).to_string()),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(identity_key).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::from(k.as_str()), identity_key(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        other => other.to_string(),
    }
}

/// Returns a short name for the value's kind.
#[must_use]
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_prefers_integers() {
        assert_eq!(number(150.0), json!(150));
        assert_eq!(number(2.5), json!(2.5));
        assert_eq!(number(-4.0), json!(-4));
        assert_eq!(number(f64::NAN), Value::Null);
    }

    #[test]
    fn equality_ignores_number_representation() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn mixed_kinds_do_not_compare() {
        assert_eq!(partial_compare(&json!(1), &json!("1")), None);
        assert_eq!(partial_compare(&json!(1), &json!(2)), Some(Ordering::Less));
    }

    #[test]
    fn total_order_ranks_kinds() {
        let mut values = vec![json!("b"), json!(3), json!(null), json!(true), json!("a"), json!(1)];
        values.sort_by(compare);
        assert_eq!(values, vec![json!(null), json!(true), json!(1), json!(3), json!("a"), json!("b")]);
    }

    #[test]
    fn identity_ignores_key_order() {
        assert_eq!(
            identity_key(&json!({"a": 1, "b": [2.0]})),
            identity_key(&json!({"b": [2], "a": 1}))
        );
        assert_ne!(identity_key(&json!({"a": 1})), identity_key(&json!({"a": "1"})));
    }

    #[test]
    fn stringify_strips_quotes() {
        assert_eq!(stringify(&json!("x")), "x");
        assert_eq!(stringify(&json!(12)), "12");
    }
}
