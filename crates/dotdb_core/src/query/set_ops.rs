//! Set operations over row lists, keyed by full-row structural equality.

use crate::value::{identity_key, Row};
use serde_json::Value;
use std::collections::HashSet;

/// Removes structurally equal duplicates, keeping first occurrences.
#[must_use]
pub fn distinct(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(identity_key(&Value::Object(row.clone()))))
        .collect()
}

/// Concatenates and deduplicates.
#[must_use]
pub fn union(first: Vec<Row>, second: Vec<Row>) -> Vec<Row> {
    distinct(union_all(first, second))
}

/// Concatenates, keeping duplicates.
#[must_use]
pub fn union_all(mut first: Vec<Row>, second: Vec<Row>) -> Vec<Row> {
    first.extend(second);
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[serde_json::Value]) -> Vec<Row> {
        values.iter().map(|v| v.as_object().cloned().unwrap()).collect()
    }

    #[test]
    fn distinct_ignores_key_order_and_number_form() {
        let out = distinct(rows(&[
            json!({"a": 1, "b": "x"}),
            json!({"b": "x", "a": 1.0}),
            json!({"a": 2, "b": "x"}),
        ]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["a"], json!(2));
    }

    #[test]
    fn union_variants() {
        let a = rows(&[json!({"v": 1}), json!({"v": 2})]);
        let b = rows(&[json!({"v": 2}), json!({"v": 3})]);
        assert_eq!(union_all(a.clone(), b.clone()).len(), 4);
        let merged = union(a, b);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2]["v"], json!(3));
    }
}
