//! Grouping and aggregation.

use super::filter::Filter;
use crate::table::ID_COLUMN;
use crate::value::{compare, identity_key, number, Row};
use serde_json::Value;
use std::collections::HashMap;

/// Options for `group_by`.
#[derive(Debug, Clone, Default)]
pub struct GroupBy {
    /// Columns whose values form the group key.
    pub columns: Vec<String>,
    /// Rows considered before grouping.
    pub filter: Option<Filter>,
    /// Test applied to each output group row.
    pub having: Option<Filter>,
}

impl GroupBy {
    /// Groups by the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Filters rows before grouping.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Filters groups on their computed fields (`count`, `sum_amount`, ...).
    #[must_use]
    pub fn having(mut self, having: Filter) -> Self {
        self.having = Some(having);
        self
    }
}

/// Partitions rows and summarizes each partition.
///
/// Each output row holds the group columns, `count`, and for every other
/// column that is numeric in the group's first row: `sum_<col>`,
/// `avg_<col>`, `min_<col>`, `max_<col>`. Groups appear in the order their
/// first row was seen.
#[must_use]
pub fn group_by(rows: Vec<Row>, spec: &GroupBy) -> Vec<Row> {
    let rows = match &spec.filter {
        Some(filter) => filter.apply(rows),
        None => rows,
    };

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Row>> = HashMap::new();
    for row in rows {
        let key = spec
            .columns
            .iter()
            .map(|c| identity_key(row.get(c).unwrap_or(&Value::Null)))
            .collect::<Vec<_>>()
            .join("\u{1f}");
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let Some(members) = groups.remove(&key) else {
            continue;
        };
        let summary = summarize(&spec.columns, &members);
        if spec.having.as_ref().map_or(true, |h| h.matches(&summary)) {
            out.push(summary);
        }
    }
    out
}

fn summarize(group_columns: &[String], members: &[Row]) -> Row {
    let mut summary = Row::new();
    let Some(first) = members.first() else {
        return summary;
    };
    for column in group_columns {
        summary.insert(
            column.clone(),
            first.get(column).cloned().unwrap_or(Value::Null),
        );
    }
    summary.insert("count".to_string(), Value::from(members.len()));

    for (column, value) in first {
        if column == ID_COLUMN || group_columns.contains(column) || !value.is_number() {
            continue;
        }
        let numbers: Vec<f64> = members
            .iter()
            .filter_map(|r| r.get(column).and_then(Value::as_f64))
            .collect();
        let sum: f64 = numbers.iter().sum();
        summary.insert(format!("sum_{column}"), number(sum));
        summary.insert(format!("avg_{column}"), mean(sum, numbers.len()));
        summary.insert(
            format!("min_{column}"),
            numbers.iter().copied().reduce(f64::min).map_or(Value::Null, number),
        );
        summary.insert(
            format!("max_{column}"),
            numbers.iter().copied().reduce(f64::max).map_or(Value::Null, number),
        );
    }
    summary
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, count: usize) -> Value {
    if count == 0 {
        Value::Null
    } else {
        number(sum / count as f64)
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// Rows (`*`) or non-null values.
    Count,
    /// Sum of numeric values.
    Sum,
    /// Mean of numeric values.
    Avg,
    /// Smallest non-null value.
    Min,
    /// Largest non-null value.
    Max,
}

/// A named aggregate over one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Output field name.
    pub name: String,
    /// Function applied.
    pub function: AggregateFn,
    /// Input column, or `*` for `Count`.
    pub column: String,
}

impl Aggregate {
    /// Creates an aggregate.
    #[must_use]
    pub fn new(name: impl Into<String>, function: AggregateFn, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function,
            column: column.into(),
        }
    }

    /// `COUNT(*)`
    #[must_use]
    pub fn count_all(name: impl Into<String>) -> Self {
        Self::new(name, AggregateFn::Count, "*")
    }

    fn compute(&self, rows: &[Row]) -> Value {
        if self.function == AggregateFn::Count && self.column == "*" {
            return Value::from(rows.len());
        }
        let values: Vec<&Value> = rows
            .iter()
            .filter_map(|r| r.get(&self.column))
            .filter(|v| !v.is_null())
            .collect();
        let numbers = || values.iter().filter_map(|v| v.as_f64());
        match self.function {
            AggregateFn::Count => Value::from(values.len()),
            AggregateFn::Sum => number(numbers().sum()),
            AggregateFn::Avg => mean(numbers().sum(), numbers().count()),
            AggregateFn::Min => values
                .iter()
                .min_by(|a, b| compare(a, b))
                .map_or(Value::Null, |v| (*v).clone()),
            AggregateFn::Max => values
                .iter()
                .max_by(|a, b| compare(a, b))
                .map_or(Value::Null, |v| (*v).clone()),
        }
    }
}

/// Computes each aggregate over the whole row set.
#[must_use]
pub fn aggregate(rows: &[Row], aggregates: &[Aggregate]) -> Row {
    aggregates
        .iter()
        .map(|a| (a.name.clone(), a.compute(rows)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders() -> Vec<Row> {
        [
            json!({"id": "1", "status": "completed", "amount": 100}),
            json!({"id": "2", "status": "completed", "amount": 50}),
            json!({"id": "3", "status": "pending", "amount": 10}),
        ]
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn groups_with_summaries() {
        let groups = group_by(orders(), &GroupBy::new(["status"]));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["status"], json!("completed"));
        assert_eq!(groups[0]["count"], json!(2));
        assert_eq!(groups[0]["sum_amount"], json!(150));
        assert_eq!(groups[0]["avg_amount"], json!(75));
        assert_eq!(groups[0]["min_amount"], json!(50));
        assert_eq!(groups[0]["max_amount"], json!(100));
        assert_eq!(groups[1]["count"], json!(1));
        assert_eq!(groups[1]["sum_amount"], json!(10));
        assert!(!groups[0].contains_key("sum_id"));
    }

    #[test]
    fn having_filters_groups() {
        let spec = GroupBy::new(["status"]).having(Filter::new().gt("count", 1));
        let groups = group_by(orders(), &spec);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["status"], json!("completed"));
    }

    #[test]
    fn filter_applies_before_grouping() {
        let spec = GroupBy::new(["status"]).filter(Filter::new().gte("amount", 50));
        let groups = group_by(orders(), &spec);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn flat_aggregates() {
        let mut rows = orders();
        rows[2].insert("amount".into(), Value::Null);
        let result = aggregate(
            &rows,
            &[
                Aggregate::count_all("rows"),
                Aggregate::new("priced", AggregateFn::Count, "amount"),
                Aggregate::new("total", AggregateFn::Sum, "amount"),
                Aggregate::new("mean", AggregateFn::Avg, "amount"),
                Aggregate::new("low", AggregateFn::Min, "amount"),
                Aggregate::new("high", AggregateFn::Max, "amount"),
            ],
        );
        assert_eq!(result["rows"], json!(3));
        assert_eq!(result["priced"], json!(2));
        assert_eq!(result["total"], json!(150));
        assert_eq!(result["mean"], json!(75));
        assert_eq!(result["low"], json!(50));
        assert_eq!(result["high"], json!(100));
    }

    #[test]
    fn empty_input() {
        let result = aggregate(&[], &[Aggregate::new("m", AggregateFn::Avg, "x")]);
        assert_eq!(result["m"], Value::Null);
        assert!(group_by(Vec::new(), &GroupBy::new(["x"])).is_empty());
    }
}
