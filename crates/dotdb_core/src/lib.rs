//! # DotDB Core
//!
//! Core engine for DotDB, an embedded document store that keeps its whole
//! dataset in memory as a path-addressed tree and persists it to one file.
//!
//! This crate provides:
//! - A per-value codec (JSON, deflate, base64, AES-256-GCM)
//! - The path store (`users.42.name` style addressing)
//! - Tables with schemas, validation, relations, and schema evolution
//! - An in-memory query engine: filters, ordering, pagination, grouping,
//!   aggregates, joins, and set operations
//! - Persistence with atomic replace, timestamped backups, and restore
//!
//! ## Example
//!
//! ```rust,ignore
//! use dotdb_core::{ColumnType, Config, Database, Filter, Query, TableSchema, ValidationRule};
//! use serde_json::json;
//!
//! let db = Database::open("app.json", Config::new("secret"))?;
//! db.create_table(
//!     "users",
//!     TableSchema::new().column("name").column_with(
//!         "age",
//!         ValidationRule::new().of_type(ColumnType::Number).min(0.0).max(120.0),
//!     ),
//! )?;
//! db.insert("users", &json!({"name": "John", "age": 30}))?;
//! let adults = db.query("users", &Query::new().filter(Filter::new().gt("age", 25)))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod database;
mod error;
pub mod persistence;
pub mod query;
mod stats;
mod store;
pub mod table;
mod value;
mod value_codec;

pub use config::Config;
pub use database::{Database, DatabaseInfo};
pub use error::{CoreError, CoreResult};
pub use query::{
    Aggregate, AggregateFn, Condition, Direction, Filter, GroupBy, JoinKind, JoinSpec, OrderBy,
    Query,
};
pub use stats::{DatabaseStats, StatsSnapshot};
pub use store::{Arithmetic, PathStore};
pub use table::{AlterTable, ColumnType, Relation, TableInfo, TableMeta, TableSchema, ValidationRule};
pub use value::{compare, values_equal, Row};
pub use value_codec::ValueCodec;

pub use dotdb_codec::{Document, Format};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
