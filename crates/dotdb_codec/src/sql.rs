//! SQL export codec.
//!
//! Renders a document as a batch of SQL statements:
//!
//! ```text
//! CREATE TABLE "users" ("id" TEXT PRIMARY KEY, "name" TEXT, "age" REAL);
//! CREATE INDEX "idx_users_age" ON "users" ("age");
//! INSERT INTO "users" ("id", "name", "age") VALUES ('0190...', '...', '...');
//! ```
//!
//! Row values are written as they are stored, so encrypted cells stay
//! encrypted in the export. Plain key/value entries go into a `_kv_store`
//! table, a name no user table can take. Loading SQL back is not supported.

use crate::error::{CodecError, CodecResult};
use crate::{is_table, Document, Format, FormatCodec, META_KEY};
use serde_json::Value;
use std::fmt::Write;

/// Table that receives top-level entries that are not tables.
const KV_TABLE: &str = "_kv_store";

/// Writes documents as SQL statements. Export-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCodec;

impl FormatCodec for SqlCodec {
    fn encode(&self, document: &Document) -> CodecResult<String> {
        let mut out = String::new();
        let mut plain = Vec::new();

        for (name, node) in document {
            match node.as_object() {
                Some(table) if is_table(node) => write_table(&mut out, name, table)?,
                _ => plain.push((name, node)),
            }
        }

        if !plain.is_empty() {
            push_line(
                &mut out,
                format_args!(
                    "CREATE TABLE {} ({} TEXT PRIMARY KEY, {} TEXT);",
                    ident(KV_TABLE),
                    ident("key"),
                    ident("value")
                ),
            )?;
            for (key, value) in plain {
                push_line(
                    &mut out,
                    format_args!(
                        "INSERT INTO {} ({}, {}) VALUES ({}, {});",
                        ident(KV_TABLE),
                        ident("key"),
                        ident("value"),
                        quote(key),
                        literal(value)
                    ),
                )?;
            }
        }

        Ok(out)
    }

    fn decode(&self, _text: &str) -> CodecResult<Document> {
        Err(CodecError::ExportOnly { format: "SQL" })
    }

    fn format(&self) -> Format {
        Format::Sql
    }
}

fn write_table(out: &mut String, name: &str, table: &Document) -> CodecResult<()> {
    let meta = table.get(META_KEY).and_then(Value::as_object);
    let columns: Vec<&str> = meta
        .and_then(|m| m.get("columns"))
        .and_then(Value::as_array)
        .map(|cols| cols.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let validations = meta.and_then(|m| m.get("validations")).and_then(Value::as_object);

    let mut defs = vec![format!("{} TEXT PRIMARY KEY", ident("id"))];
    for column in &columns {
        let declared = validations
            .and_then(|v| v.get(*column))
            .and_then(|rule| rule.get("type"))
            .and_then(Value::as_str);
        defs.push(format!("{} {}", ident(column), sql_type(declared)));
    }
    push_line(
        out,
        format_args!("CREATE TABLE {} ({});", ident(name), defs.join(", ")),
    )?;

    let indexes = meta
        .and_then(|m| m.get("indexes"))
        .and_then(Value::as_array)
        .map(|idx| idx.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    for column in indexes {
        push_line(
            out,
            format_args!(
                "CREATE INDEX {} ON {} ({});",
                ident(&format!("idx_{name}_{column}")),
                ident(name),
                ident(column)
            ),
        )?;
    }

    let mut header = vec![ident("id")];
    header.extend(columns.iter().map(|c| ident(c)));
    for (row_id, row) in table.iter().filter(|(k, _)| k.as_str() != META_KEY) {
        let mut values = vec![quote(row_id)];
        for column in &columns {
            values.push(row.get(*column).map_or_else(|| "NULL".to_string(), literal));
        }
        push_line(
            out,
            format_args!(
                "INSERT INTO {} ({}) VALUES ({});",
                ident(name),
                header.join(", "),
                values.join(", ")
            ),
        )?;
    }

    Ok(())
}

fn push_line(out: &mut String, line: std::fmt::Arguments<'_>) -> CodecResult<()> {
    out.write_fmt(line)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    out.push('\n');
    Ok(())
}

fn sql_type(declared: Option<&str>) -> &'static str {
    match declared {
        Some("number") => "REAL",
        Some("boolean") => "BOOLEAN",
        _ => "TEXT",
    }
}

fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn exports_tables_indexes_and_rows() {
        let document = doc(json!({
            "users": {
                "_meta": {
                    "columns": ["name", "age"],
                    "validations": {"age": {"type": "number"}},
                    "indexes": ["age"],
                    "relations": {},
                    "rowCount": 1
                },
                "r1": {"name": "enc-name", "age": "enc-age"}
            }
        }));

        let sql = SqlCodec.encode(&document).unwrap();
        let lines: Vec<_> = sql.lines().collect();
        assert_eq!(
            lines[0],
            r#"CREATE TABLE "users" ("id" TEXT PRIMARY KEY, "name" TEXT, "age" REAL);"#
        );
        assert_eq!(lines[1], r#"CREATE INDEX "idx_users_age" ON "users" ("age");"#);
        assert_eq!(
            lines[2],
            r#"INSERT INTO "users" ("id", "name", "age") VALUES ('r1', 'enc-name', 'enc-age');"#
        );
    }

    #[test]
    fn plain_keys_go_to_kv_store() {
        let sql = SqlCodec
            .encode(&doc(json!({"motd": "it's fine", "limit": 3})))
            .unwrap();
        assert!(sql.starts_with(r#"CREATE TABLE "_kv_store""#));
        assert!(sql.contains(r#"VALUES ('motd', 'it''s fine');"#));
        assert!(sql.contains(r#"VALUES ('limit', 3);"#));
    }

    #[test]
    fn user_table_named_kv_store_keeps_its_own_statements() {
        let document = doc(json!({
            "kv_store": {"_meta": {"columns": ["a"]}, "r": {"a": 1}},
            "motd": "hi"
        }));
        let sql = SqlCodec.encode(&document).unwrap();
        assert_eq!(sql.matches(r#"CREATE TABLE "kv_store""#).count(), 1);
        assert!(sql.contains(r#"INSERT INTO "kv_store" ("id", "a") VALUES ('r', 1);"#));
        assert!(sql.contains(r#"INSERT INTO "_kv_store" ("key", "value") VALUES ('motd', 'hi');"#));
    }

    #[test]
    fn missing_cells_become_null() {
        let document = doc(json!({
            "t": {"_meta": {"columns": ["a", "b"]}, "r": {"a": true}}
        }));
        let sql = SqlCodec.encode(&document).unwrap();
        assert!(sql.contains("VALUES ('r', TRUE, NULL);"));
    }

    #[test]
    fn decode_is_export_only() {
        assert_eq!(
            SqlCodec.decode("SELECT 1;"),
            Err(CodecError::ExportOnly { format: "SQL" })
        );
    }
}
