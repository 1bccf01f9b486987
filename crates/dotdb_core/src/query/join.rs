//! Equi-joins between two tables' rows.

use crate::table::ID_COLUMN;
use crate::value::{values_equal, Row};
use serde_json::Value;

/// Join semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    /// Matched pairs only.
    #[default]
    Inner,
    /// Every left row; right side nulled when unmatched.
    Left,
    /// Every row of both sides; the missing side is nulled.
    Outer,
}

/// Which columns to match on and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    /// Join kind.
    pub kind: JoinKind,
    /// Column of the left table.
    pub left_column: String,
    /// Column of the right table.
    pub right_column: String,
}

impl JoinSpec {
    /// Creates a join on `left_column = right_column`.
    #[must_use]
    pub fn new(kind: JoinKind, left_column: impl Into<String>, right_column: impl Into<String>) -> Self {
        Self {
            kind,
            left_column: left_column.into(),
            right_column: right_column.into(),
        }
    }
}

/// One side of a join: a table's name, declared columns, and rows.
#[derive(Debug, Clone)]
pub struct JoinSide<'a> {
    /// Table name, used for the `<table>_id` marker.
    pub table: &'a str,
    /// Declared columns, used to null an unmatched side.
    pub columns: &'a [String],
    /// Decoded rows.
    pub rows: Vec<Row>,
}

/// Joins two row sets.
///
/// Output rows hold the left columns, then the right columns, then
/// `<left>_id` and `<right>_id`. A right column whose name is already taken
/// by the left side is emitted as `<right>_<column>`. `null` keys never
/// match.
#[must_use]
pub fn join(left: JoinSide<'_>, right: JoinSide<'_>, spec: &JoinSpec) -> Vec<Row> {
    let mut out = Vec::new();
    let mut right_matched = vec![false; right.rows.len()];

    for l in &left.rows {
        let key = l.get(&spec.left_column).unwrap_or(&Value::Null);
        let mut matched = false;
        if !key.is_null() {
            for (i, r) in right.rows.iter().enumerate() {
                let other = r.get(&spec.right_column).unwrap_or(&Value::Null);
                if values_equal(key, other) {
                    matched = true;
                    right_matched[i] = true;
                    out.push(combine(&left, Some(l), &right, Some(r)));
                }
            }
        }
        if !matched && spec.kind != JoinKind::Inner {
            out.push(combine(&left, Some(l), &right, None));
        }
    }

    if spec.kind == JoinKind::Outer {
        for (r, matched) in right.rows.iter().zip(right_matched) {
            if !matched {
                out.push(combine(&left, None, &right, Some(r)));
            }
        }
    }
    out
}

fn combine(left: &JoinSide<'_>, l: Option<&Row>, right: &JoinSide<'_>, r: Option<&Row>) -> Row {
    let mut row = Row::new();
    for column in left.columns {
        let value = l.and_then(|l| l.get(column)).cloned().unwrap_or(Value::Null);
        row.insert(column.clone(), value);
    }
    for column in right.columns {
        let value = r.and_then(|r| r.get(column)).cloned().unwrap_or(Value::Null);
        let name = if left.columns.contains(column) {
            format!("{}_{column}", right.table)
        } else {
            column.clone()
        };
        row.insert(name, value);
    }
    row.insert(format!("{}_{ID_COLUMN}", left.table), marker(l));
    row.insert(format!("{}_{ID_COLUMN}", right.table), marker(r));
    row
}

fn marker(row: Option<&Row>) -> Value {
    row.and_then(|r| r.get(ID_COLUMN)).cloned().unwrap_or(Value::Null)
}
