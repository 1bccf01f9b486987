//! Table operations on top of the path store.
//!
//! A table is the top-level node `<name>` holding a plain `_meta` schema
//! plus one child per row. Row cells are sealed individually, so a row is
//! a flat map of column to token. Callers only ever see decoded row views,
//! which carry the row key under `id`.

use super::schema::{
    validate_identifier, AlterTable, Relation, TableInfo, TableMeta, TableSchema, ID_COLUMN,
};
use super::validate::validate_row;
use crate::error::{CoreError, CoreResult};
use crate::query::Filter;
use crate::store::PathStore;
use crate::value::{stringify, values_equal, Row};
use chrono::Utc;
use dotdb_codec::{is_table, Document, META_KEY};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

impl PathStore {
    /// Reads a table's schema.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `name` is not a table.
    pub fn table_meta(&self, name: &str) -> CoreResult<TableMeta> {
        let meta = self
            .tree()
            .get(name)
            .filter(|node| is_table(node))
            .and_then(|node| node.get(META_KEY))
            .ok_or_else(|| CoreError::not_found(format!("table {name:?}")))?;
        serde_json::from_value(meta.clone()).map_err(|e| {
            CoreError::invalid_operation(format!("schema of table {name:?} is unreadable: {e}"))
        })
    }

    /// Returns true if `name` is a table.
    #[must_use]
    pub fn is_table(&self, name: &str) -> bool {
        self.tree().get(name).is_some_and(is_table)
    }

    /// Names of all tables in insertion order.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.tree()
            .iter()
            .filter(|(_, node)| is_table(node))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a name is malformed, the key is taken,
    /// a rule, index, or relation names an undeclared column, or a relation
    /// target does not exist.
    pub fn create_table(&mut self, name: &str, schema: TableSchema) -> CoreResult<TableMeta> {
        validate_identifier(name, "table")?;
        if self.tree().contains_key(name) {
            return Err(CoreError::validation(format!("table {name:?} already exists")));
        }

        let mut columns: Vec<String> = Vec::with_capacity(schema.columns.len());
        for column in schema.columns {
            validate_identifier(&column, "column")?;
            if column == ID_COLUMN {
                return Err(CoreError::validation(format!(
                    "column name {ID_COLUMN:?} is reserved for the row key"
                )));
            }
            if columns.contains(&column) {
                return Err(CoreError::validation(format!(
                    "column {column:?} is declared twice"
                )));
            }
            columns.push(column);
        }

        let mut meta = TableMeta {
            columns,
            validations: schema.validations,
            indexes: Vec::new(),
            relations: schema.relations,
            created: Utc::now(),
            row_count: 0,
        };
        for (column, rule) in &meta.validations {
            meta.require_column(name, column)?;
            rule.check(column)?;
        }
        for column in schema.indexes {
            meta.require_column(name, &column)?;
            if !meta.indexes.contains(&column) {
                meta.indexes.push(column);
            }
        }
        for (column, relation) in &meta.relations {
            meta.require_column(name, column)?;
            self.check_relation_target(relation)?;
        }

        self.write_meta(name, &meta)?;
        info!(table = name, columns = meta.columns.len(), "created table");
        Ok(meta)
    }

    /// Applies a schema change.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables and a validation error when the
    /// change does not fit the current schema.
    pub fn alter_table(&mut self, name: &str, change: AlterTable) -> CoreResult<TableMeta> {
        let mut meta = self.table_meta(name)?;
        match change {
            AlterTable::AddColumn { name: column, rule } => {
                validate_identifier(&column, "column")?;
                if column == ID_COLUMN || meta.has_column(&column) {
                    return Err(CoreError::validation(format!(
                        "table {name:?} already has column {column:?}"
                    )));
                }
                if let Some(rule) = rule {
                    rule.check(&column)?;
                    if !self.row_ids(name).is_empty() {
                        return Err(CoreError::validation(format!(
                            "column {column:?} cannot carry a rule while {name:?} has rows"
                        )));
                    }
                    meta.validations.insert(column.clone(), rule);
                }
                meta.columns.push(column.clone());
                for id in self.row_ids(name) {
                    self.raw_set(&[name, &id, &column], Value::Null)?;
                }
                debug!(table = name, column = %column, "added column");
            }
            AlterTable::DropColumn(column) => {
                meta.require_column(name, &column)?;
                meta.columns.retain(|c| c != &column);
                meta.validations.remove(&column);
                meta.indexes.retain(|c| c != &column);
                meta.relations.remove(&column);
                for id in self.row_ids(name) {
                    if let Some(Value::Object(row)) = self.raw_get_mut(&[name, &id]) {
                        row.shift_remove(&column);
                    }
                }
                debug!(table = name, column = %column, "dropped column");
            }
            AlterTable::ModifyColumn { name: column, rule } => {
                meta.require_column(name, &column)?;
                match rule {
                    Some(rule) => {
                        rule.check(&column)?;
                        meta.validations.insert(column, rule);
                    }
                    None => {
                        meta.validations.remove(&column);
                    }
                }
            }
            AlterTable::AddIndex(column) => {
                meta.require_column(name, &column)?;
                if meta.indexes.contains(&column) {
                    return Err(CoreError::validation(format!(
                        "column {column:?} of {name:?} is already indexed"
                    )));
                }
                meta.indexes.push(column);
            }
            AlterTable::DropIndex(column) => {
                let before = meta.indexes.len();
                meta.indexes.retain(|c| c != &column);
                if meta.indexes.len() == before {
                    return Err(CoreError::validation(format!(
                        "column {column:?} of {name:?} is not indexed"
                    )));
                }
            }
        }
        meta.row_count = self.row_ids(name).len();
        self.write_meta(name, &meta)?;
        Ok(meta)
    }

    /// Removes a table and all its rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> CoreResult<()> {
        self.table_meta(name)?;
        self.raw_remove(&[name]);
        info!(table = name, "dropped table");
        Ok(())
    }

    /// Renames a table.
    ///
    /// Relations in other tables that point at the old name are not
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `from` is not a table and a validation error if
    /// `to` is malformed or taken.
    pub fn rename_table(&mut self, from: &str, to: &str) -> CoreResult<()> {
        validate_identifier(to, "table")?;
        self.table_meta(from)?;
        if self.tree().contains_key(to) {
            return Err(CoreError::validation(format!("table {to:?} already exists")));
        }
        if let Some(node) = self.raw_remove(&[from]) {
            self.raw_set(&[to], node)?;
        }
        info!(from, to, "renamed table");
        Ok(())
    }

    /// Describes a table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn describe(&self, name: &str) -> CoreResult<TableInfo> {
        Ok(TableInfo::new(name, self.table_meta(name)?))
    }

    /// Checks a row against a table's schema and relations.
    ///
    /// `id` in the row is ignored.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate_row(&self, name: &str, row: &Row) -> CoreResult<()> {
        let meta = self.table_meta(name)?;
        let row = without_id(row);
        self.validate_with(name, &meta, &row)
    }

    /// Decoded rows of a table, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables, or a crypto error in strict mode.
    pub fn rows(&self, name: &str) -> CoreResult<Vec<Row>> {
        self.table_meta(name)?;
        let mut rows = Vec::new();
        for id in self.row_ids(name) {
            if let Some(row) = self.decode_row(name, &id)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// One decoded row.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables, or a crypto error in strict mode.
    pub fn find_row(&self, name: &str, id: &str) -> CoreResult<Option<Row>> {
        self.table_meta(name)?;
        if id == META_KEY {
            return Ok(None);
        }
        self.decode_row(name, id)
    }

    /// Validates and stores a new row under a fresh key.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the row does not fit the schema.
    pub fn insert_row(&mut self, name: &str, data: &Row) -> CoreResult<Row> {
        let meta = self.table_meta(name)?;
        let row = without_id(data);
        self.validate_with(name, &meta, &row)?;

        let id = self.fresh_id(name);
        self.write_row(name, &id, &meta, &row)?;
        self.refresh_row_count(name, meta)?;
        debug!(table = name, id = %id, "inserted row");
        Ok(view(&id, row))
    }

    /// Inserts rows in order, stopping at the first failure.
    ///
    /// Rows inserted before the failing one stay.
    ///
    /// # Errors
    ///
    /// Returns the first row's failure.
    pub fn insert_rows(&mut self, name: &str, rows: &[Row]) -> CoreResult<Vec<Row>> {
        let mut inserted = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match self.insert_row(name, row) {
                Ok(row) => inserted.push(row),
                Err(e) => {
                    debug!(table = name, index, inserted = inserted.len(), "batch insert stopped");
                    return Err(e);
                }
            }
        }
        Ok(inserted)
    }

    /// Merges `changes` into an existing row and re-validates it.
    ///
    /// `null` entries in `changes` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row does not exist, or a validation error
    /// if the merged row does not fit the schema.
    pub fn update_row(&mut self, name: &str, id: &str, changes: &Row) -> CoreResult<Row> {
        let meta = self.table_meta(name)?;
        let mut row = self
            .find_row(name, id)?
            .ok_or_else(|| CoreError::not_found(format!("row {id:?} in table {name:?}")))?;
        row.shift_remove(ID_COLUMN);
        for (column, value) in changes {
            if column != ID_COLUMN && !value.is_null() {
                row.insert(column.clone(), value.clone());
            }
        }
        self.validate_with(name, &meta, &row)?;
        self.write_row(name, id, &meta, &row)?;
        self.refresh_row_count(name, meta)?;
        debug!(table = name, id, "updated row");
        Ok(view(id, row))
    }

    /// Updates every row matching `filter`; returns how many changed.
    ///
    /// # Errors
    ///
    /// Stops at the first row that fails validation.
    pub fn update_where(&mut self, name: &str, filter: &Filter, changes: &Row) -> CoreResult<usize> {
        let ids: Vec<String> = self
            .rows(name)?
            .into_iter()
            .filter(|row| filter.matches(row))
            .filter_map(|row| row.get(ID_COLUMN).map(stringify))
            .collect();
        for id in &ids {
            self.update_row(name, id, changes)?;
        }
        Ok(ids.len())
    }

    /// Updates the row whose `unique` columns equal those in `data`, or
    /// inserts `data` if there is none.
    ///
    /// With no unique columns this always inserts.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a unique column is undeclared or
    /// missing from `data`, or if the written row fails validation.
    pub fn upsert_row(&mut self, name: &str, data: &Row, unique: &[&str]) -> CoreResult<Row> {
        if unique.is_empty() {
            return self.insert_row(name, data);
        }
        let meta = self.table_meta(name)?;
        let mut filter = Filter::new();
        for column in unique {
            meta.require_column(name, column)?;
            let value = data.get(*column).ok_or_else(|| {
                CoreError::validation(format!("upsert key {column:?} is missing from the data"))
            })?;
            filter = filter.eq(*column, value.clone());
        }
        let existing = self
            .rows(name)?
            .into_iter()
            .find(|row| filter.matches(row))
            .and_then(|row| row.get(ID_COLUMN).map(stringify));
        match existing {
            Some(id) => self.update_row(name, &id, data),
            None => self.insert_row(name, data),
        }
    }

    /// Deletes one row; returns false if it was not there.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn delete_row(&mut self, name: &str, id: &str) -> CoreResult<bool> {
        let meta = self.table_meta(name)?;
        if id == META_KEY {
            return Err(CoreError::validation(format!(
                "{META_KEY} is not a row of table {name:?}"
            )));
        }
        let removed = self
            .tree_mut()
            .get_mut(name)
            .and_then(Value::as_object_mut)
            .and_then(|table| table.shift_remove(id))
            .is_some();
        if removed {
            self.refresh_row_count(name, meta)?;
        }
        Ok(removed)
    }

    /// Deletes every row matching `filter`; returns how many went.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn delete_where(&mut self, name: &str, filter: &Filter) -> CoreResult<usize> {
        let ids: Vec<String> = self
            .rows(name)?
            .into_iter()
            .filter(|row| filter.matches(row))
            .filter_map(|row| row.get(ID_COLUMN).map(stringify))
            .collect();
        for id in &ids {
            self.delete_row(name, id)?;
        }
        Ok(ids.len())
    }

    /// Deletes every row, keeping the schema; returns how many went.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn truncate(&mut self, name: &str) -> CoreResult<usize> {
        let meta = self.table_meta(name)?;
        let count = self.row_ids(name).len();
        if let Some(Value::Object(table)) = self.tree_mut().get_mut(name) {
            table.retain(|key, _| key == META_KEY);
        }
        self.refresh_row_count(name, meta)?;
        info!(table = name, rows = count, "truncated table");
        Ok(count)
    }

    fn row_ids(&self, name: &str) -> Vec<String> {
        self.tree()
            .get(name)
            .and_then(Value::as_object)
            .map(|table| {
                table
                    .keys()
                    .filter(|k| k.as_str() != META_KEY)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn decode_row(&self, name: &str, id: &str) -> CoreResult<Option<Row>> {
        let Some(stored) = self.raw_get(&[name, id]) else {
            return Ok(None);
        };
        let Value::Object(cells) = stored else {
            debug!(table = name, id, "skipping non-object row");
            return Ok(None);
        };
        let mut row = Row::new();
        row.insert(ID_COLUMN.to_string(), Value::String(id.to_string()));
        for (column, cell) in cells {
            row.insert(column.clone(), self.codec().decode(cell)?);
        }
        Ok(Some(row))
    }

    fn write_row(&mut self, name: &str, id: &str, meta: &TableMeta, row: &Row) -> CoreResult<()> {
        let mut cells = Document::new();
        for column in &meta.columns {
            let value = row.get(column).unwrap_or(&Value::Null);
            cells.insert(column.clone(), self.codec().encode(value)?);
        }
        self.raw_set(&[name, id], Value::Object(cells))
    }

    fn write_meta(&mut self, name: &str, meta: &TableMeta) -> CoreResult<()> {
        let value = serde_json::to_value(meta).map_err(|e| {
            CoreError::invalid_operation(format!("cannot serialize schema of {name:?}: {e}"))
        })?;
        self.raw_set(&[name, META_KEY], value)
    }

    fn refresh_row_count(&mut self, name: &str, mut meta: TableMeta) -> CoreResult<()> {
        meta.row_count = self.row_ids(name).len();
        self.write_meta(name, &meta)
    }

    fn fresh_id(&self, name: &str) -> String {
        loop {
            let id = Uuid::now_v7().simple().to_string();
            if self.raw_get(&[name, &id]).is_none() {
                return id;
            }
        }
    }

    fn validate_with(&self, name: &str, meta: &TableMeta, row: &Row) -> CoreResult<()> {
        validate_row(name, meta, row, |relation, value| {
            self.relation_resolves(relation, value)
        })
    }

    fn check_relation_target(&self, relation: &Relation) -> CoreResult<()> {
        let target = self.table_meta(&relation.table).map_err(|_| {
            CoreError::validation(format!(
                "relation target table {:?} does not exist",
                relation.table
            ))
        })?;
        if relation.column != ID_COLUMN && !target.has_column(&relation.column) {
            return Err(CoreError::validation(format!(
                "relation target column {}.{} does not exist",
                relation.table, relation.column
            )));
        }
        Ok(())
    }

    fn relation_resolves(&self, relation: &Relation, value: &Value) -> CoreResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        self.check_relation_target(relation)?;
        if relation.column == ID_COLUMN {
            let key = stringify(value);
            return Ok(key != META_KEY && self.raw_get(&[&relation.table, &key]).is_some());
        }
        Ok(self
            .rows(&relation.table)?
            .iter()
            .any(|row| row.get(&relation.column).is_some_and(|v| values_equal(v, value))))
    }
}

fn without_id(row: &Row) -> Row {
    row.iter()
        .filter(|(k, _)| k.as_str() != ID_COLUMN)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn view(id: &str, row: Row) -> Row {
    let mut out = Row::with_capacity(row.len() + 1);
    out.insert(ID_COLUMN.to_string(), Value::String(id.to_string()));
    out.extend(row);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, ValidationRule};
    use crate::value_codec::ValueCodec;
    use serde_json::json;

    fn store() -> PathStore {
        PathStore::new(
            Document::new(),
            ValueCodec::from_secret("table-tests", false).unwrap(),
        )
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn users(s: &mut PathStore) {
        s.create_table(
            "users",
            TableSchema::new().column("name").column_with(
                "age",
                ValidationRule::new().of_type(ColumnType::Number).min(0.0).max(120.0),
            ),
        )
        .unwrap();
    }

    #[test]
    fn create_and_describe() {
        let mut s = store();
        users(&mut s);
        let info = s.describe("users").unwrap();
        assert_eq!(info.columns, ["name", "age"]);
        assert_eq!(info.row_count, 0);
        assert_eq!(s.list_tables(), ["users"]);
    }

    #[test]
    fn create_rejections() {
        let mut s = store();
        users(&mut s);
        assert!(s.create_table("users", TableSchema::new().column("x")).is_err());
        assert!(s.create_table("9bad", TableSchema::new()).is_err());
        assert!(s.create_table("t", TableSchema::new().column("bad-name")).is_err());
        assert!(s.create_table("t", TableSchema::new().column("id")).is_err());
        assert!(s
            .create_table("t", TableSchema::new().column("a").index("b"))
            .is_err());
        assert!(s
            .create_table(
                "t",
                TableSchema::new().column("a").validate("b", ValidationRule::new())
            )
            .is_err());
        assert!(s
            .create_table(
                "t",
                TableSchema::new().column("a").relation("a", Relation::to_id("ghosts"))
            )
            .is_err());
        assert!(s
            .create_table(
                "t",
                TableSchema::new().column("a").relation("a", Relation::new("users", "email"))
            )
            .is_err());
        assert!(!s.is_table("t"));
    }

    #[test]
    fn insert_view_and_storage() {
        let mut s = store();
        users(&mut s);
        let inserted = s
            .insert_row("users", &row(json!({"name": "John", "age": 30, "id": "ignored"})))
            .unwrap();
        let id = inserted["id"].as_str().unwrap().to_string();
        assert_ne!(id, "ignored");
        assert_eq!(id.len(), 32);

        let raw = s.raw_get(&["users", &id, "name"]).unwrap();
        assert_ne!(raw, &json!("John"));
        assert_eq!(s.find_row("users", &id).unwrap().unwrap(), inserted);
        assert_eq!(s.describe("users").unwrap().row_count, 1);
    }

    #[test]
    fn insert_rejects_bad_rows() {
        let mut s = store();
        users(&mut s);
        assert!(s.insert_row("users", &row(json!({"name": "x"}))).is_err());
        assert!(s
            .insert_row("users", &row(json!({"name": "x", "age": 1, "extra": 2})))
            .is_err());
        assert!(s.insert_row("users", &row(json!({"name": "x", "age": 500}))).is_err());
        assert!(s.insert_row("nobody", &row(json!({}))).unwrap_err().is_not_found());
        assert_eq!(s.rows("users").unwrap().len(), 0);
    }

    #[test]
    fn insert_many_stops_at_failure() {
        let mut s = store();
        users(&mut s);
        let batch = [
            row(json!({"name": "a", "age": 1})),
            row(json!({"name": "b", "age": -1})),
            row(json!({"name": "c", "age": 3})),
        ];
        assert!(s.insert_rows("users", &batch).is_err());
        let rows = s.rows("users").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("a"));
    }

    #[test]
    fn update_merges_and_revalidates() {
        let mut s = store();
        users(&mut s);
        let id = s.insert_row("users", &row(json!({"name": "Ann", "age": 30}))).unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let updated = s
            .update_row("users", &id, &row(json!({"age": 31, "name": null})))
            .unwrap();
        assert_eq!(updated["name"], json!("Ann"));
        assert_eq!(updated["age"], json!(31));

        assert!(s.update_row("users", &id, &row(json!({"age": 999}))).is_err());
        assert!(s.update_row("users", &id, &row(json!({"nick": "A"}))).is_err());
        assert!(s
            .update_row("users", "missing", &row(json!({"age": 1})))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn upsert_by_unique_columns() {
        let mut s = store();
        s.create_table("users", TableSchema::new().columns(["email", "name"]))
            .unwrap();
        s.upsert_row("users", &row(json!({"email": "x@y.com", "name": "X"})), &["email"])
            .unwrap();
        s.upsert_row("users", &row(json!({"email": "x@y.com", "name": "Y"})), &["email"])
            .unwrap();
        let rows = s.rows("users").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Y"));

        s.upsert_row("users", &row(json!({"email": "x@y.com", "name": "Z"})), &[])
            .unwrap();
        assert_eq!(s.rows("users").unwrap().len(), 2);
    }

    #[test]
    fn delete_and_truncate() {
        let mut s = store();
        users(&mut s);
        for (name, age) in [("a", 10), ("b", 20), ("c", 30)] {
            s.insert_row("users", &row(json!({"name": name, "age": age})))
                .unwrap();
        }
        assert_eq!(s.delete_where("users", &Filter::new().gt("age", 15)).unwrap(), 2);
        assert_eq!(s.describe("users").unwrap().row_count, 1);
        let id = s.rows("users").unwrap()[0]["id"].as_str().unwrap().to_string();
        assert!(s.delete_row("users", &id).unwrap());
        assert!(!s.delete_row("users", &id).unwrap());
        assert!(s.delete_row("users", META_KEY).is_err());

        s.insert_row("users", &row(json!({"name": "d", "age": 1}))).unwrap();
        assert_eq!(s.truncate("users").unwrap(), 1);
        assert!(s.is_table("users"));
        assert_eq!(s.describe("users").unwrap().row_count, 0);
    }

    #[test]
    fn update_where_counts() {
        let mut s = store();
        users(&mut s);
        for age in [10, 20, 30] {
            s.insert_row("users", &row(json!({"name": "n", "age": age})))
                .unwrap();
        }
        let changed = s
            .update_where("users", &Filter::new().gte("age", 20), &row(json!({"name": "old"})))
            .unwrap();
        assert_eq!(changed, 2);
        let old = s
            .rows("users")
            .unwrap()
            .into_iter()
            .filter(|r| r["name"] == json!("old"))
            .count();
        assert_eq!(old, 2);
    }

    #[test]
    fn alter_columns_and_indexes() {
        let mut s = store();
        users(&mut s);
        s.insert_row("users", &row(json!({"name": "a", "age": 1}))).unwrap();

        s.alter_table(
            "users",
            AlterTable::AddColumn { name: "email".into(), rule: None },
        )
        .unwrap();
        assert_eq!(s.rows("users").unwrap()[0]["email"], Value::Null);
        assert!(s
            .alter_table("users", AlterTable::AddColumn { name: "email".into(), rule: None })
            .is_err());

        let ruled = AlterTable::AddColumn {
            name: "phone".into(),
            rule: Some(ValidationRule::new().of_type(ColumnType::String)),
        };
        assert!(matches!(
            s.alter_table("users", ruled),
            Err(CoreError::Validation { .. })
        ));
        assert!(!s.describe("users").unwrap().columns.contains(&"phone".to_string()));

        s.alter_table("users", AlterTable::AddIndex("email".into())).unwrap();
        assert!(s.alter_table("users", AlterTable::AddIndex("email".into())).is_err());
        s.alter_table("users", AlterTable::DropColumn("email".into())).unwrap();
        let info = s.describe("users").unwrap();
        assert!(!info.columns.contains(&"email".to_string()));
        assert!(info.indexes.is_empty());
        assert!(!s.rows("users").unwrap()[0].contains_key("email"));

        s.alter_table(
            "users",
            AlterTable::ModifyColumn {
                name: "name".into(),
                rule: Some(ValidationRule::new().of_type(ColumnType::String)),
            },
        )
        .unwrap();
        assert!(s.insert_row("users", &row(json!({"name": 5, "age": 1}))).is_err());
        assert!(s.alter_table("users", AlterTable::DropIndex("name".into())).is_err());
    }

    #[test]
    fn relations_checked_on_write() {
        let mut s = store();
        users(&mut s);
        let uid = s.insert_row("users", &row(json!({"name": "a", "age": 1}))).unwrap()["id"]
            .clone();
        s.create_table(
            "orders",
            TableSchema::new()
                .columns(["user", "owner"])
                .relation("user", Relation::to_id("users"))
                .relation("owner", Relation::new("users", "name")),
        )
        .unwrap();

        s.insert_row("orders", &row(json!({"user": uid, "owner": "a"}))).unwrap();
        assert!(s
            .insert_row("orders", &row(json!({"user": "nope", "owner": "a"})))
            .is_err());
        assert!(s
            .insert_row("orders", &row(json!({"user": uid, "owner": "zed"})))
            .is_err());
    }

    #[test]
    fn drop_and_rename() {
        let mut s = store();
        users(&mut s);
        s.create_table("other", TableSchema::new().column("x")).unwrap();
        assert!(s.rename_table("users", "other").is_err());
        s.rename_table("users", "people").unwrap();
        assert!(s.is_table("people"));
        assert!(!s.is_table("users"));
        s.drop_table("people").unwrap();
        assert!(s.drop_table("people").unwrap_err().is_not_found());
        assert_eq!(s.list_tables(), ["other"]);
    }
}
