//! Tables: schema, row validation, and row CRUD.

mod engine;
mod schema;
mod validate;

pub use schema::{
    validate_identifier, AlterTable, ColumnType, Relation, TableInfo, TableMeta, TableSchema,
    ValidationRule, ID_COLUMN,
};
