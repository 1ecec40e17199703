//! Declarative table schemas
//!
//! Every stored record type describes its own table once, as an ordered list
//! of [`ColumnDefinition`]s. Everything else is derived from that list:
//! - `CREATE TABLE` / `CREATE INDEX` statements
//! - column additions for databases created by an older build
//! - the ingestion projection that drops JSON keys a table does not declare
//!
//! # Usage
//!
//! ```rust,ignore
//! impl TableSchema for Project {
//!     fn table_name() -> &'static str { "project" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::id(),
//!             ColumnDefinition::quarter(),
//!             ColumnDefinition::new("lop_id", "TEXT").indexed(),
//!         ]
//!     }
//! }
//!
//! SchemaSync::create_table::<Project>(&pool).await?;
//! ```

use crate::Result;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name (also the JSON key accepted at ingestion)
    pub name: &'static str,
    /// SQL type: INTEGER, REAL or TEXT (JSON blobs are TEXT)
    pub sql_type: &'static str,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Option<&'static str>,
    /// `REFERENCES ...` clause, without the keyword
    pub references: Option<&'static str>,
    /// Create a secondary index on this column
    pub indexed: bool,
    /// Filled in by the loader, never taken from an ingested record
    pub loader_managed: bool,
}

impl ColumnDefinition {
    pub fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            not_null: false,
            primary_key: false,
            default_value: None,
            references: None,
            indexed: false,
            loader_managed: false,
        }
    }

    /// Auto-incrementing row identifier. Identifiers are never reused, so a
    /// higher id always means a later insert.
    pub fn id() -> Self {
        Self::new("id", "INTEGER").primary_key().loader_managed()
    }

    /// Period tag stamped on every ingested row
    pub fn quarter() -> Self {
        Self::new("quarter", "TEXT")
            .not_null()
            .indexed()
            .loader_managed()
    }

    /// Source sheet name stamped on raw sheet rows
    pub fn sheet() -> Self {
        Self::new("sheet", "TEXT").loader_managed()
    }

    /// Employee identifier
    pub fn nik() -> Self {
        Self::new("nik", "INTEGER").indexed()
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, "TEXT")
    }

    pub fn real(name: &'static str) -> Self {
        Self::new(name, "REAL")
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, "INTEGER")
    }

    /// Serialized JSON document
    pub fn json(name: &'static str) -> Self {
        Self::new(name, "TEXT")
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: &'static str) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn references(mut self, target: &'static str) -> Self {
        self.references = Some(target);
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn loader_managed(mut self) -> Self {
        self.loader_managed = true;
        self
    }

    /// Column clause as it appears inside `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.sql_type == "INTEGER" {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some(target) = self.references {
            sql.push_str(" REFERENCES ");
            sql.push_str(target);
        }
        sql
    }
}

/// Defines the table backing one record type
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Column definitions in table order
    fn expected_columns() -> Vec<ColumnDefinition>;

    fn has_column(name: &str) -> bool {
        Self::expected_columns().iter().any(|c| c.name == name)
    }

    fn create_table_sql() -> String {
        let columns: Vec<String> = Self::expected_columns()
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            Self::table_name(),
            columns.join(",\n    ")
        )
    }

    fn create_index_sql() -> Vec<String> {
        let table = Self::table_name();
        Self::expected_columns()
            .iter()
            .filter(|c| c.indexed)
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table} ({col})",
                    table = table,
                    col = c.name
                )
            })
            .collect()
    }

    /// Keep only the keys this table declares as record fields.
    ///
    /// Unknown keys are dropped silently. Values are not inspected: this is a
    /// projection, not a validator. Loader-managed columns (`id`, `quarter`,
    /// `sheet`) are dropped too, since the loader stamps them itself.
    fn filter_known_fields(record: &Map<String, Value>) -> Map<String, Value> {
        let accepted: Vec<&'static str> = Self::expected_columns()
            .iter()
            .filter(|c| !c.loader_managed)
            .map(|c| c.name)
            .collect();

        record
            .iter()
            .filter(|(key, _)| accepted.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
}

/// Differences between a declared table and the one found on disk
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Declared column absent from the database (fixed with ALTER TABLE)
    MissingColumn(ColumnDefinition),
    /// Same column, incompatible type (reported only)
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
}

/// Creates tables and keeps them in step with their declarations
pub struct SchemaSync;

impl SchemaSync {
    /// Create the table and its indexes, then add any missing columns
    pub async fn create_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        sqlx::query(&T::create_table_sql()).execute(pool).await?;
        for index_sql in T::create_index_sql() {
            sqlx::query(&index_sql).execute(pool).await?;
        }
        Self::sync_table::<T>(pool).await
    }

    pub async fn introspect_table(pool: &SqlitePool, table: &str) -> Result<Vec<ActualColumn>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(pool)
            .await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
            })
            .collect();
        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    pub fn compare(expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
        expected
            .iter()
            .filter_map(|col| match actual.iter().find(|a| a.name == col.name) {
                None => Some(SchemaDrift::MissingColumn(col.clone())),
                Some(found) if !found.type_name.eq_ignore_ascii_case(col.sql_type) => {
                    Some(SchemaDrift::TypeMismatch {
                        column: col.name.to_string(),
                        expected: col.sql_type.to_string(),
                        actual: found.type_name.clone(),
                    })
                }
                Some(_) => None,
            })
            .collect()
    }

    /// Add declared columns an existing table lacks
    ///
    /// Type changes are reported but left alone; they need a manual migration.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        let actual = Self::introspect_table(pool, table).await?;
        let drift = Self::compare(&T::expected_columns(), &actual);

        if drift.is_empty() {
            debug!("Schema up to date for '{}'", table);
            return Ok(());
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn(column) => {
                    // ALTER TABLE cannot add key or NOT NULL-without-default columns
                    let mut sql = format!(
                        "ALTER TABLE {} ADD COLUMN {} {}",
                        table, column.name, column.sql_type
                    );
                    if let Some(default) = column.default_value {
                        sql.push_str(" DEFAULT ");
                        sql.push_str(default);
                    }
                    info!("Adding column {}.{} ({})", table, column.name, column.sql_type);
                    sqlx::query(&sql).execute(pool).await?;
                }
                SchemaDrift::TypeMismatch {
                    column,
                    expected,
                    actual,
                } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Widget;

    impl TableSchema for Widget {
        fn table_name() -> &'static str {
            "widget"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::id(),
                ColumnDefinition::quarter(),
                ColumnDefinition::nik(),
                ColumnDefinition::text("name"),
                ColumnDefinition::real("score").default("0"),
            ]
        }
    }

    #[test]
    fn test_create_table_sql() {
        let sql = Widget::create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS widget"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("quarter TEXT NOT NULL"));
        assert!(sql.contains("score REAL DEFAULT 0"));
    }

    #[test]
    fn test_index_sql_only_for_indexed_columns() {
        let indexes = Widget::create_index_sql();
        assert_eq!(indexes.len(), 2);
        assert!(indexes.iter().any(|s| s.contains("idx_widget_quarter")));
        assert!(indexes.iter().any(|s| s.contains("idx_widget_nik")));
    }

    #[test]
    fn test_filter_known_fields_drops_unknown_keys() {
        let record = json!({
            "nik": 12345,
            "name": "Ali Rahman",
            "score": 3.5,
            "No": 7,
            "Unnamed: 12": null
        });
        let filtered = Widget::filter_known_fields(record.as_object().unwrap());

        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered["nik"], json!(12345));
        assert_eq!(filtered["name"], json!("Ali Rahman"));
        assert_eq!(filtered["score"], json!(3.5));
    }

    #[test]
    fn test_filter_known_fields_drops_loader_managed_columns() {
        let record = json!({ "id": 99, "quarter": "Q9 1999", "name": "x" });
        let filtered = Widget::filter_known_fields(record.as_object().unwrap());

        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("name"));
    }

    #[test]
    fn test_has_column() {
        assert!(Widget::has_column("nik"));
        assert!(!Widget::has_column("lop_id"));
    }

    #[test]
    fn test_compare_detects_missing_and_mismatched_columns() {
        let actual = vec![
            ActualColumn { cid: 0, name: "id".into(), type_name: "INTEGER".into() },
            ActualColumn { cid: 1, name: "quarter".into(), type_name: "TEXT".into() },
            ActualColumn { cid: 2, name: "nik".into(), type_name: "TEXT".into() },
            ActualColumn { cid: 3, name: "name".into(), type_name: "text".into() },
        ];
        let drift = SchemaSync::compare(&Widget::expected_columns(), &actual);

        assert_eq!(drift.len(), 2);
        assert!(drift.iter().any(|d| matches!(d, SchemaDrift::TypeMismatch { column, .. } if column == "nik")));
        assert!(drift.iter().any(|d| matches!(d, SchemaDrift::MissingColumn(c) if c.name == "score")));
    }

    #[tokio::test]
    async fn test_sync_adds_missing_column() {
        let pool = crate::db::init::init_memory_database().await.unwrap();

        sqlx::query("CREATE TABLE widget (id INTEGER PRIMARY KEY AUTOINCREMENT, quarter TEXT NOT NULL, nik INTEGER, name TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        SchemaSync::create_table::<Widget>(&pool).await.unwrap();

        let columns = SchemaSync::introspect_table(&pool, "widget").await.unwrap();
        assert!(columns.iter().any(|c| c.name == "score"));
    }
}
