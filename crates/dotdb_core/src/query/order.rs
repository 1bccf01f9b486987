//! Row ordering.

use crate::error::{CoreError, CoreResult};
use crate::value::{compare, Row};
use serde_json::Value;
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl Direction {
    /// Parses `asc` or `desc`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a validation error for any other word.
    pub fn parse(word: &str) -> CoreResult<Self> {
        match word.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::validation(format!(
                "unknown sort direction {other:?}"
            ))),
        }
    }
}

/// One column of an ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Column to sort by.
    pub column: String,
    /// Direction.
    pub direction: Direction,
}

/// A stable multi-column ordering; later keys break ties of earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy {
    keys: Vec<SortKey>,
}

impl OrderBy {
    /// Ascending on one column.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new().then(column, Direction::Asc)
    }

    /// Descending on one column.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new().then(column, Direction::Desc)
    }

    fn new() -> Self {
        Self::default()
    }

    /// Adds a tie-break key.
    #[must_use]
    pub fn then(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.keys.push(SortKey {
            column: column.into(),
            direction,
        });
        self
    }

    /// Builds an ordering from `(column, direction)` pairs, in priority order.
    #[must_use]
    pub fn multiple<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, Direction)>,
        S: Into<String>,
    {
        keys.into_iter()
            .fold(Self::new(), |order, (column, direction)| order.then(column, direction))
    }

    /// Parses `"column"` or `"column asc|desc"`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty string, an unknown direction,
    /// or trailing words.
    pub fn parse(spec: &str) -> CoreResult<Self> {
        let mut words = spec.split_whitespace();
        let column = words
            .next()
            .ok_or_else(|| CoreError::validation("order by needs a column"))?;
        let direction = words.next().map_or(Ok(Direction::Asc), Direction::parse)?;
        if words.next().is_some() {
            return Err(CoreError::validation(format!(
                "order by {spec:?} has trailing words"
            )));
        }
        Ok(Self::new().then(column, direction))
    }

    /// The sort keys in priority order.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compares two rows.
    #[must_use]
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for key in &self.keys {
            let left = a.get(&key.column).unwrap_or(&Value::Null);
            let right = b.get(&key.column).unwrap_or(&Value::Null);
            let ord = match key.direction {
                Direction::Asc => compare(left, right),
                Direction::Desc => compare(right, left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Sorts rows in place, keeping the input order of ties.
    pub fn sort(&self, rows: &mut [Row]) {
        if !self.keys.is_empty() {
            rows.sort_by(|a, b| self.compare(a, b));
        }
    }
}
