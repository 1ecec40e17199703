//! Storage: connection setup, table declarations and row models

pub mod init;
pub mod models;
pub mod schema;
pub mod table_schemas;

pub use init::*;
pub use models::*;
pub use schema::{ColumnDefinition, SchemaSync, TableSchema};
pub use table_schemas::create_all_tables;
