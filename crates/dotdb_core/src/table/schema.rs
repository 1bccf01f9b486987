//! Table schema types.
//!
//! A table's schema is persisted as the table's `_meta` node in camelCase
//! JSON, so it survives the on-disk formats unchanged.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Column name reserved for the row key in row views.
pub const ID_COLUMN: &str = "id";

/// Checks a table or column name against `^[A-Za-z][A-Za-z0-9_]*$`.
///
/// # Errors
///
/// Returns a validation error naming `what` if the identifier is malformed.
pub fn validate_identifier(name: &str, what: &str) -> CoreResult<()> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| {
        Regex::new("^[A-Za-z][A-Za-z0-9_]*$").expect("identifier regex must compile")
    });
    if re.is_match(name) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "invalid {what} name {name:?}: must start with a letter and contain only letters, digits, or underscores"
        )))
    }
}

/// Runtime type tag a column can be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON object or array.
    Object,
}

impl ColumnType {
    /// Returns true if `value` has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object() || value.is_array(),
        }
    }

    /// Lowercase tag as stored in the schema.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints checked on one column whenever a row is written.
///
/// A column with a rule must never be null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Required runtime type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
    /// Inclusive lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression the stringified value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl ValidationRule {
    /// Creates an empty rule (only forbids null).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a runtime type.
    #[must_use]
    pub fn of_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Sets the inclusive minimum.
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive maximum.
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets a regular expression.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Restricts the column to a fixed set of values.
    #[must_use]
    pub fn one_of(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed = Some(values.into_iter().collect());
        self
    }

    /// Checks that the rule itself is usable.
    pub(crate) fn check(&self, column: &str) -> CoreResult<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(CoreError::validation(format!(
                    "column {column:?}: min {min} is greater than max {max}"
                )));
            }
        }
        if let Some(pattern) = &self.pattern {
            compiled_pattern(pattern).map_err(|e| {
                CoreError::validation(format!("column {column:?}: invalid pattern: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Compiles a rule pattern once per process.
///
/// Schemas are re-read from `_meta` on every write, so compiled patterns
/// are kept by source text rather than on the rule.
pub(crate) fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let mut cache = PATTERNS.get_or_init(Mutex::default).lock();
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

/// Foreign-key descriptor: the column's values must name a row of `table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Target table.
    pub table: String,
    /// Target column; `id` refers to the row key.
    pub column: String,
}

impl Relation {
    /// Creates a relation to `table.column`.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a relation to the row key of `table`.
    #[must_use]
    pub fn to_id(table: impl Into<String>) -> Self {
        Self::new(table, ID_COLUMN)
    }
}

/// Schema stored under a table's `_meta` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    /// Declared columns in order.
    pub columns: Vec<String>,
    /// Per-column rules.
    #[serde(default)]
    pub validations: BTreeMap<String, ValidationRule>,
    /// Columns flagged as indexed. Informational only.
    #[serde(default)]
    pub indexes: Vec<String>,
    /// Per-column foreign keys.
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Number of rows, refreshed after every row write.
    #[serde(default)]
    pub row_count: usize,
}

impl TableMeta {
    /// Returns true if `column` is declared.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub(crate) fn require_column(&self, table: &str, column: &str) -> CoreResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "table {table:?} has no column {column:?}"
            )))
        }
    }
}

/// Declarative description of a new table.
///
/// ```rust,ignore
/// let schema = TableSchema::new()
///     .column("name")
///     .column_with("age", ValidationRule::new().of_type(ColumnType::Number).min(0.0))
///     .index("name");
/// db.create_table("users", schema)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub(crate) columns: Vec<String>,
    pub(crate) validations: BTreeMap<String, ValidationRule>,
    pub(crate) indexes: Vec<String>,
    pub(crate) relations: BTreeMap<String, Relation>,
}

impl TableSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a column without constraints.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Declares several unconstrained columns.
    #[must_use]
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares a column with a rule.
    #[must_use]
    pub fn column_with(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        let name = name.into();
        self.columns.push(name.clone());
        self.validations.insert(name, rule);
        self
    }

    /// Attaches a rule to a column (declared separately).
    #[must_use]
    pub fn validate(mut self, column: impl Into<String>, rule: ValidationRule) -> Self {
        self.validations.insert(column.into(), rule);
        self
    }

    /// Flags a column as indexed.
    #[must_use]
    pub fn index(mut self, column: impl Into<String>) -> Self {
        self.indexes.push(column.into());
        self
    }

    /// Adds a foreign key on `column`.
    #[must_use]
    pub fn relation(mut self, column: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(column.into(), relation);
        self
    }
}

/// A schema change applied by `alter_table`.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterTable {
    /// Adds a column; existing rows get `null`.
    ///
    /// A rule rejects `null`, so `rule` is only accepted on an empty table.
    AddColumn {
        /// New column name.
        name: String,
        /// Optional rule for the column.
        rule: Option<ValidationRule>,
    },
    /// Removes a column from the schema and from every row.
    DropColumn(String),
    /// Replaces (or with `None`, removes) a column's rule. Existing values
    /// are not converted or re-checked.
    ModifyColumn {
        /// Existing column name.
        name: String,
        /// New rule.
        rule: Option<ValidationRule>,
    },
    /// Flags a column as indexed.
    AddIndex(String),
    /// Clears a column's index flag.
    DropIndex(String),
}

/// Summary returned by `describe`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Declared columns.
    pub columns: Vec<String>,
    /// Per-column rules.
    pub validations: BTreeMap<String, ValidationRule>,
    /// Indexed columns.
    pub indexes: Vec<String>,
    /// Foreign keys.
    pub relations: BTreeMap<String, Relation>,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Current number of rows.
    pub row_count: usize,
}

impl TableInfo {
    pub(crate) fn new(name: &str, meta: TableMeta) -> Self {
        Self {
            name: name.to_string(),
            columns: meta.columns,
            validations: meta.validations,
            indexes: meta.indexes,
            relations: meta.relations,
            created: meta.created,
            row_count: meta.row_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers() {
        assert!(validate_identifier("users", "table").is_ok());
        assert!(validate_identifier("order_items2", "table").is_ok());
        assert!(validate_identifier("2fast", "table").is_err());
        assert!(validate_identifier("has-dash", "column").is_err());
        assert!(validate_identifier("", "column").is_err());
        assert!(validate_identifier("_meta", "column").is_err());
    }

    #[test]
    fn column_types() {
        assert!(ColumnType::Number.matches(&json!(1.5)));
        assert!(!ColumnType::Number.matches(&json!("1")));
        assert!(ColumnType::Object.matches(&json!([1])));
        assert!(ColumnType::Object.matches(&json!({})));
        assert!(ColumnType::Boolean.matches(&json!(false)));
    }

    #[test]
    fn rule_serializes_with_reserved_words() {
        let rule = ValidationRule::new()
            .of_type(ColumnType::String)
            .one_of([json!("a"), json!("b")]);
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value, json!({"type": "string", "enum": ["a", "b"]}));
        let back: ValidationRule = serde_json::from_value(value).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn meta_uses_camel_case() {
        let meta = TableMeta {
            columns: vec!["name".into()],
            validations: BTreeMap::new(),
            indexes: vec![],
            relations: BTreeMap::new(),
            created: Utc::now(),
            row_count: 3,
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["rowCount"], json!(3));
        assert!(value["created"].is_string());
    }

    #[test]
    fn broken_rules_rejected() {
        assert!(ValidationRule::new().min(5.0).max(1.0).check("n").is_err());
        assert!(ValidationRule::new().pattern("(").check("s").is_err());
        assert!(ValidationRule::new().pattern("^a").check("s").is_ok());
    }

    #[test]
    fn patterns_compile_once() {
        let first = compiled_pattern("^cached-[0-9]+$").unwrap();
        let second = compiled_pattern("^cached-[0-9]+$").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(second.is_match("cached-42"));
        assert!(compiled_pattern("(").is_err());
    }
}
