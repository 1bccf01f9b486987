//! Table inspection and query commands.

use dotdb_core::{Database, OrderBy, Query};
use serde_json::Value;

/// Options collected from the `query` subcommand.
#[derive(Debug, Default)]
pub struct QueryOptions {
    /// Filter as JSON text.
    pub filter: Option<String>,
    /// Ordering text, e.g. `age desc`.
    pub order: Option<String>,
    /// Rows to skip.
    pub offset: Option<usize>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
    /// Columns to keep; empty keeps all.
    pub select: Vec<String>,
}

impl QueryOptions {
    /// Builds the engine query.
    pub fn build(&self) -> Result<Query, Box<dyn std::error::Error>> {
        let mut query = match &self.filter {
            Some(text) => {
                let spec: Value = serde_json::from_str(text)
                    .map_err(|e| format!("--where is not valid JSON: {e}"))?;
                Query::from_where(&spec)?
            }
            None => Query::new(),
        };
        if let Some(order) = &self.order {
            query = query.order_by(OrderBy::parse(order)?);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if !self.select.is_empty() {
            query = query.select(self.select.iter().map(String::as_str));
        }
        Ok(query)
    }
}

/// Lists tables with row counts.
pub fn list(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let info = db.info()?;
    if info.tables.is_empty() {
        println!("No tables");
        return Ok(());
    }
    println!("{:<24} {:>10}", "Table", "Rows");
    println!("{:-<24} {:->10}", "", "");
    for (name, rows) in &info.tables {
        println!("{name:<24} {rows:>10}");
    }
    Ok(())
}

/// Prints a table's schema as JSON.
pub fn describe(db: &Database, table: &str) -> Result<(), Box<dyn std::error::Error>> {
    let info = db.describe(table)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Runs a query and prints the page plus the total match count.
pub fn query(
    db: &Database,
    table: &str,
    options: &QueryOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let (rows, total) = db.find_and_count(table, &options.build()?)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    eprintln!("{} of {total} matching rows", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotdb_core::{Config, TableSchema};
    use serde_json::json;

    fn db() -> Database {
        let db = Database::open_in_memory(Config::new("cli")).unwrap();
        db.create_table("users", TableSchema::new().columns(["name", "age"]))
            .unwrap();
        for (name, age) in [("a", 10), ("b", 20), ("c", 30)] {
            db.insert("users", &json!({"name": name, "age": age})).unwrap();
        }
        db
    }

    #[test]
    fn options_build_a_query() {
        let options = QueryOptions {
            filter: Some(r#"{"age": {"$gte": 20}}"#.to_string()),
            order: Some("age desc".to_string()),
            limit: Some(1),
            select: vec!["name".to_string()],
            ..QueryOptions::default()
        };
        let rows = db().query("users", &options.build().unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Value::Object(rows[0].clone()), json!({"name": "c"}));
    }

    #[test]
    fn bad_filter_is_reported() {
        let options = QueryOptions {
            filter: Some("{age".to_string()),
            ..QueryOptions::default()
        };
        assert!(options.build().is_err());
    }
}
