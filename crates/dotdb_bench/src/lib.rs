//! Benchmark utilities.

use dotdb_core::{ColumnType, Config, Database, Row, TableSchema, ValidationRule};
use rand::Rng;
use serde_json::{json, Value};

const STATUSES: [&str; 4] = ["pending", "paid", "shipped", "cancelled"];

/// Secret shared by every benchmark database.
pub const SECRET: &str = "bench-secret";

/// Opens an in-memory database that never saves.
pub fn memory_db() -> Database {
    Database::open_in_memory(Config::new(SECRET).auto_save(false))
        .expect("in-memory database opens")
}

/// Schema of the `orders` table used by the query benchmarks.
pub fn orders_schema() -> TableSchema {
    TableSchema::new()
        .column("customer")
        .column_with("status", ValidationRule::new().of_type(ColumnType::String))
        .column_with(
            "amount",
            ValidationRule::new().of_type(ColumnType::Number).min(0.0),
        )
        .index("status")
}

/// Generate a random order payload.
pub fn random_order() -> Value {
    let mut rng = rand::thread_rng();
    json!({
        "customer": format!("customer-{}", rng.gen_range(0..500)),
        "status": STATUSES[rng.gen_range(0..STATUSES.len())],
        "amount": rng.gen_range(1..10_000),
    })
}

/// Generate `count` decoded order rows without touching a database.
pub fn generate_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let mut row = random_order().as_object().cloned().unwrap_or_default();
            row.insert("id".to_string(), json!(format!("{i:08}")));
            row
        })
        .collect()
}

/// Opens a database holding an `orders` table with `count` rows.
pub fn populated_db(count: usize) -> Database {
    let db = memory_db();
    db.create_table("orders", orders_schema())
        .expect("orders table is created");
    let rows: Vec<Value> = (0..count).map(|_| random_order()).collect();
    db.insert_many("orders", &rows).expect("orders are inserted");
    db
}
