//! Row validation against a table schema.
//!
//! Checks run in a fixed order so the same bad row always produces the
//! same error: missing columns, extra columns, per-column rules in
//! declaration order, then relations.

use super::schema::{compiled_pattern, Relation, TableMeta, ValidationRule};
use crate::error::{CoreError, CoreResult};
use crate::value::{kind_name, stringify, values_equal, Row};
use serde_json::Value;

/// Validates `row` for `table`.
///
/// `resolve` answers whether a relation target exists for a value.
pub(crate) fn validate_row<F>(
    table: &str,
    meta: &TableMeta,
    row: &Row,
    mut resolve: F,
) -> CoreResult<()>
where
    F: FnMut(&Relation, &Value) -> CoreResult<bool>,
{
    let missing: Vec<&str> = meta
        .columns
        .iter()
        .filter(|c| !row.contains_key(c.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::validation(format!(
            "table {table:?}: missing columns: {}",
            missing.join(", ")
        )));
    }

    let extra: Vec<&str> = row
        .keys()
        .filter(|k| !meta.has_column(k))
        .map(String::as_str)
        .collect();
    if !extra.is_empty() {
        return Err(CoreError::validation(format!(
            "table {table:?}: unknown columns: {}",
            extra.join(", ")
        )));
    }

    for column in &meta.columns {
        if let Some(rule) = meta.validations.get(column) {
            let value = row.get(column).unwrap_or(&Value::Null);
            check_rule(table, column, rule, value)?;
        }
    }

    for (column, relation) in &meta.relations {
        let value = row.get(column).unwrap_or(&Value::Null);
        if !resolve(relation, value)? {
            return Err(CoreError::validation(format!(
                "table {table:?}: {column} = {} does not match any {}.{}",
                stringify(value),
                relation.table,
                relation.column
            )));
        }
    }

    Ok(())
}

fn check_rule(table: &str, column: &str, rule: &ValidationRule, value: &Value) -> CoreResult<()> {
    let fail = |reason: String| {
        Err(CoreError::validation(format!(
            "table {table:?}, column {column:?}: {reason}"
        )))
    };

    if value.is_null() {
        return fail("value is required".to_string());
    }

    if let Some(expected) = rule.column_type {
        if !expected.matches(value) {
            return fail(format!("expected {expected}, got {}", kind_name(value)));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.min {
            if n < min {
                return fail(format!("{n} is below the minimum {min}"));
            }
        }
        if let Some(max) = rule.max {
            if n > max {
                return fail(format!("{n} is above the maximum {max}"));
            }
        }
    }

    if let Some(pattern) = &rule.pattern {
        let re = compiled_pattern(pattern)
            .map_err(|e| CoreError::validation(format!("invalid pattern for {column:?}: {e}")))?;
        if !re.is_match(&stringify(value)) {
            return fail(format!("value does not match pattern {pattern:?}"));
        }
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| values_equal(a, value)) {
            return fail(format!("{} is not an allowed value", stringify(value)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::schema::ColumnType;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn meta() -> TableMeta {
        let mut validations = BTreeMap::new();
        validations.insert(
            "age".to_string(),
            ValidationRule::new().of_type(ColumnType::Number).min(0.0).max(120.0),
        );
        validations.insert(
            "email".to_string(),
            ValidationRule::new().pattern("^[^@]+@[^@]+$"),
        );
        validations.insert(
            "role".to_string(),
            ValidationRule::new().one_of([json!("admin"), json!("user")]),
        );
        TableMeta {
            columns: vec!["name".into(), "age".into(), "email".into(), "role".into()],
            validations,
            indexes: vec![],
            relations: BTreeMap::new(),
            created: Utc::now(),
            row_count: 0,
        }
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn check(value: Value) -> CoreResult<()> {
        validate_row("users", &meta(), &row(value), |_, _| Ok(true))
    }

    fn good() -> Value {
        json!({"name": "Ann", "age": 30, "email": "a@b.c", "role": "user"})
    }

    #[test]
    fn accepts_valid_row() {
        check(good()).unwrap();
    }

    #[test]
    fn rejects_missing_and_extra() {
        let err = check(json!({"name": "Ann", "age": 30, "email": "a@b.c"})).unwrap_err();
        assert!(err.to_string().contains("missing columns: role"));

        let mut extra = good();
        extra["nickname"] = json!("A");
        let err = check(extra).unwrap_err();
        assert!(err.to_string().contains("unknown columns: nickname"));
    }

    #[test]
    fn missing_is_reported_before_extra() {
        let err = check(json!({"name": "Ann", "age": 30, "email": "a@b.c", "bogus": 1})).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn rule_violations() {
        for (column, bad) in [
            ("age", json!("thirty")),
            ("age", json!(-1)),
            ("age", json!(121)),
            ("age", Value::Null),
            ("email", json!("nope")),
            ("role", json!("root")),
        ] {
            let mut value = good();
            value[column] = bad;
            assert!(check(value).unwrap_err().is_validation());
        }
    }

    #[test]
    fn unconstrained_columns_accept_null() {
        let mut value = good();
        value["name"] = Value::Null;
        check(value).unwrap();
    }

    #[test]
    fn relation_is_checked_last() {
        let mut m = meta();
        m.relations
            .insert("role".into(), Relation::new("roles", "name"));
        let err = validate_row("users", &m, &row(good()), |_, _| Ok(false)).unwrap_err();
        assert!(err.to_string().contains("roles.name"));

        let mut bad = good();
        bad["age"] = json!(-5);
        let err = validate_row("users", &m, &row(bad), |_, _| Ok(false)).unwrap_err();
        assert!(err.to_string().contains("minimum"));
    }
}
