//! In-memory query engine.
//!
//! Every operation here is a pure function over decoded rows; the table
//! engine hands over a fresh snapshot and nothing flows back. A query
//! applies, in order:
//!
//! 1. the [`Filter`] (`where`)
//! 2. the [`OrderBy`] (stable)
//! 3. `offset`, then `limit`
//! 4. column projection (`select`)

mod aggregate;
mod filter;
mod join;
mod order;
mod set_ops;

pub use aggregate::{aggregate, group_by, Aggregate, AggregateFn, GroupBy};
pub use filter::{Condition, Filter, LikePattern};
pub use join::{join, JoinKind, JoinSide, JoinSpec};
pub use order::{Direction, OrderBy, SortKey};
pub use set_ops::{distinct, union, union_all};

use crate::error::CoreResult;
use crate::value::Row;
use serde_json::Value;

/// A filtered, ordered, paginated, projected read of one table.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Filter,
    order: Option<OrderBy>,
    offset: usize,
    limit: Option<usize>,
    columns: Option<Vec<String>>,
}

impl Query {
    /// Matches every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from a JSON `where` object.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the object cannot be parsed.
    pub fn from_where(spec: &Value) -> CoreResult<Self> {
        Ok(Self::new().filter(Filter::from_json(spec)?))
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    /// Skips the first `offset` matches.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns at most `limit` rows.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keeps only the listed columns in each result row.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Runs the query.
    #[must_use]
    pub fn run(&self, rows: Vec<Row>) -> Vec<Row> {
        self.run_counted(rows).0
    }

    /// Runs the query and also reports how many rows matched before
    /// pagination.
    #[must_use]
    pub fn run_counted(&self, rows: Vec<Row>) -> (Vec<Row>, usize) {
        let mut matched = self.filter.apply(rows);
        if let Some(order) = &self.order {
            order.sort(&mut matched);
        }
        let total = matched.len();
        let page = self.paginate(matched);
        let page = match &self.columns {
            Some(columns) => page.into_iter().map(|row| project(row, columns)).collect(),
            None => page,
        };
        (page, total)
    }

    /// Number of rows matching the filter.
    #[must_use]
    pub fn count(&self, rows: &[Row]) -> usize {
        rows.iter().filter(|row| self.filter.matches(row)).count()
    }

    fn paginate(&self, rows: Vec<Row>) -> Vec<Row> {
        let rows = rows.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

/// Keeps exactly `columns`, in that order; absent columns become `null`.
#[must_use]
pub fn project(row: Row, columns: &[String]) -> Row {
    let mut row = row;
    columns
        .iter()
        .map(|c| (c.clone(), row.remove(c).unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Vec<Row> {
        [
            json!({"id": "1", "name": "Ann", "age": 31}),
            json!({"id": "2", "name": "Bob", "age": 22}),
            json!({"id": "3", "name": "Cid", "age": 45}),
            json!({"id": "4", "name": "Dee", "age": 28}),
        ]
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn filter_order_paginate() {
        let q = Query::from_where(&json!({"age": {"$gt": 25}}))
            .unwrap()
            .order_by(OrderBy::desc("age"));
        let all = q.run(people());
        let names: Vec<_> = all.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, [json!("Cid"), json!("Ann"), json!("Dee")]);

        let second = q.clone().offset(1).limit(1).run(people());
        assert_eq!(second, vec![all[1].clone()]);
    }

    #[test]
    fn offset_past_end_is_empty() {
        assert!(Query::new().offset(10).run(people()).is_empty());
        assert!(Query::new().limit(0).run(people()).is_empty());
    }

    #[test]
    fn projection() {
        let rows = Query::new().select(["name", "missing"]).limit(1).run(people());
        assert_eq!(rows[0], json!({"name": "Ann", "missing": null}).as_object().cloned().unwrap());
    }

    #[test]
    fn counted_total_ignores_pagination() {
        let (page, total) = Query::new().limit(2).run_counted(people());
        assert_eq!(page.len(), 2);
        assert_eq!(total, 4);
        assert_eq!(Query::new().filter(Filter::new().lt("age", 30)).count(&people()), 2);
    }

    #[test]
    fn repeated_runs_agree() {
        let q = Query::new().order_by(OrderBy::asc("name")).offset(1);
        assert_eq!(q.run(people()), q.run(people()));
    }
}
