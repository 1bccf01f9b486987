//! Row predicates.
//!
//! A [`Filter`] is a conjunction of per-column conditions. It can be built
//! in code or parsed from the JSON `where` vocabulary:
//!
//! ```text
//! {"status": "open"}                      equality
//! {"age": {"$gt": 25, "$lte": 65}}        operators, all must hold
//! {"tag": {"$in": ["a", "b"]}}            membership
//! ```

use crate::error::{CoreError, CoreResult};
use crate::value::{partial_compare, stringify, values_equal, Row};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;

/// A single test applied to one column value.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Equal to.
    Eq(Value),
    /// Not equal to.
    Ne(Value),
    /// Greater than (same kind only).
    Gt(Value),
    /// Greater than or equal (same kind only).
    Gte(Value),
    /// Less than (same kind only).
    Lt(Value),
    /// Less than or equal (same kind only).
    Lte(Value),
    /// Equal to one of.
    In(Vec<Value>),
    /// Equal to none of.
    Nin(Vec<Value>),
    /// SQL `LIKE` pattern, compiled.
    Like(LikePattern),
}

impl Condition {
    /// Tests a column value; absent columns are passed as `null`.
    #[must_use]
    pub fn test(&self, value: &Value) -> bool {
        let ordered = |target: &Value, accept: fn(Ordering) -> bool| {
            partial_compare(value, target).is_some_and(accept)
        };
        match self {
            Self::Eq(target) => values_equal(value, target),
            Self::Ne(target) => !values_equal(value, target),
            Self::Gt(target) => ordered(target, Ordering::is_gt),
            Self::Gte(target) => ordered(target, Ordering::is_ge),
            Self::Lt(target) => ordered(target, Ordering::is_lt),
            Self::Lte(target) => ordered(target, Ordering::is_le),
            Self::In(list) => list.iter().any(|t| values_equal(value, t)),
            Self::Nin(list) => !list.iter().any(|t| values_equal(value, t)),
            Self::Like(pattern) => pattern.matches(value),
        }
    }
}

/// A SQL `LIKE` pattern: `%` matches any run, `_` one character.
///
/// Matching is anchored and case-insensitive against the stringified
/// value. `null` never matches.
#[derive(Debug, Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the translated expression is rejected.
    pub fn new(pattern: &str) -> CoreResult<Self> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');
        let regex = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| CoreError::validation(format!("invalid like pattern {pattern:?}: {e}")))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests a value.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        !value.is_null() && self.regex.is_match(&stringify(value))
    }
}

/// A conjunction of column conditions. The empty filter matches every row.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// Creates a filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition on `column`.
    #[must_use]
    pub fn when(mut self, column: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((column.into(), condition));
        self
    }

    /// `column == value`
    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when(column, Condition::Eq(value.into()))
    }

    /// `column != value`
    #[must_use]
    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when(column, Condition::Ne(value.into()))
    }

    /// `column > value`
    #[must_use]
    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when(column, Condition::Gt(value.into()))
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when(column, Condition::Gte(value.into()))
    }

    /// `column < value`
    #[must_use]
    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when(column, Condition::Lt(value.into()))
    }

    /// `column <= value`
    #[must_use]
    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when(column, Condition::Lte(value.into()))
    }

    /// `column IN values`
    #[must_use]
    pub fn is_in(self, column: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        self.when(column, Condition::In(values.into_iter().collect()))
    }

    /// `column NOT IN values`
    #[must_use]
    pub fn not_in(self, column: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        self.when(column, Condition::Nin(values.into_iter().collect()))
    }

    /// `low <= column <= high`
    #[must_use]
    pub fn between(
        self,
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let column = column.into();
        self.gte(column.clone(), low).lte(column, high)
    }

    /// `column LIKE pattern`
    ///
    /// # Errors
    ///
    /// Returns a validation error for patterns that cannot be compiled.
    pub fn like(self, column: impl Into<String>, pattern: &str) -> CoreResult<Self> {
        Ok(self.when(column, Condition::Like(LikePattern::new(pattern)?)))
    }

    /// Parses the JSON `where` vocabulary.
    ///
    /// Accepted operators: `$eq $ne $gt $gte $lt $lte $in $nin $like`.
    /// An object value whose keys are not all operators is compared by
    /// equality. `null` parses to the empty filter.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-object input, unknown operators,
    /// or `$in`/`$nin` operands that are not arrays.
    pub fn from_json(spec: &Value) -> CoreResult<Self> {
        let map = match spec {
            Value::Null => return Ok(Self::new()),
            Value::Object(map) => map,
            other => {
                return Err(CoreError::validation(format!(
                    "where clause must be an object, got {other}"
                )))
            }
        };

        let mut filter = Self::new();
        for (column, value) in map {
            match value {
                Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                    for (op, operand) in ops {
                        filter = filter.when(column.clone(), parse_operator(column, op, operand)?);
                    }
                }
                other => filter = filter.eq(column.clone(), other.clone()),
            }
        }
        Ok(filter)
    }

    /// Returns true if no conditions are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Columns the filter looks at.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|(c, _)| c.as_str())
    }

    /// Tests a row.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses
            .iter()
            .all(|(column, condition)| condition.test(row.get(column).unwrap_or(&Value::Null)))
    }

    /// Keeps the matching rows.
    #[must_use]
    pub fn apply(&self, rows: Vec<Row>) -> Vec<Row> {
        if self.is_empty() {
            return rows;
        }
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}

fn parse_operator(column: &str, op: &str, operand: &Value) -> CoreResult<Condition> {
    let list = || match operand {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(CoreError::validation(format!(
            "{op} on {column:?} expects an array"
        ))),
    };
    Ok(match op {
        "$eq" => Condition::Eq(operand.clone()),
        "$ne" => Condition::Ne(operand.clone()),
        "$gt" => Condition::Gt(operand.clone()),
        "$gte" => Condition::Gte(operand.clone()),
        "$lt" => Condition::Lt(operand.clone()),
        "$lte" => Condition::Lte(operand.clone()),
        "$in" => Condition::In(list()?),
        "$nin" => Condition::Nin(list()?),
        "$like" => match operand {
            Value::String(pattern) => Condition::Like(LikePattern::new(pattern)?),
            _ => {
                return Err(CoreError::validation(format!(
                    "$like on {column:?} expects a string"
                )))
            }
        },
        unknown => {
            return Err(CoreError::validation(format!(
                "unknown operator {unknown} on {column:?}"
            )))
        }
    })
}
