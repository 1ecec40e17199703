//! Raw sheet import
//!
//! Input groups the six HR sheets by quarter:
//!
//! ```json
//! {"quarters": [{"quarter": "Q1 2025", "sheets": {"orientasi": [{...}], "project": [{...}]}}]}
//! ```
//!
//! Each item is projected through its table's schema (unknown spreadsheet
//! columns are dropped), stamped with quarter and sheet name, and inserted.
//! Cell values are converted to their column's declared type; a cell that
//! does not fit (a `-` placeholder in a score column) is stored as NULL.

use super::{
    as_array, as_object, insert_row, load_json_document, log_committed, required, typed_value,
    ImportJob, ImportMode, ImportRunRecorder, ImportSummary, SqlValue,
};
use crate::db::models::{Development, Evaluation, Execution, Orientation, Performance, Project};
use crate::db::TableSchema;
use crate::{Error, Result};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// The six sheet categories of the HR workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Orientasi,
    Pelaksanaan,
    Kinerja,
    EvaluasiKinerja,
    Pengembangan,
    Project,
}

impl SheetKind {
    pub const ALL: [SheetKind; 6] = [
        SheetKind::Orientasi,
        SheetKind::Pelaksanaan,
        SheetKind::Kinerja,
        SheetKind::EvaluasiKinerja,
        SheetKind::Pengembangan,
        SheetKind::Project,
    ];

    /// Sheet name as it appears in the input document
    pub fn sheet_name(&self) -> &'static str {
        match self {
            SheetKind::Orientasi => "orientasi",
            SheetKind::Pelaksanaan => "pelaksanaan",
            SheetKind::Kinerja => "kinerja",
            SheetKind::EvaluasiKinerja => "evaluasi kinerja",
            SheetKind::Pengembangan => "pengembangan",
            SheetKind::Project => "project",
        }
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.sheet_name() == name)
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            SheetKind::Orientasi => Orientation::table_name(),
            SheetKind::Pelaksanaan => Execution::table_name(),
            SheetKind::Kinerja => Performance::table_name(),
            SheetKind::EvaluasiKinerja => Evaluation::table_name(),
            SheetKind::Pengembangan => Development::table_name(),
            SheetKind::Project => Project::table_name(),
        }
    }
}

pub async fn import_raw_sheets_file(
    pool: &SqlitePool,
    path: &Path,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let document = load_json_document(path)?;
    import_raw_sheets(pool, &document, mode).await
}

pub async fn import_raw_sheets(
    pool: &SqlitePool,
    document: &Value,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let recorder = ImportRunRecorder::start(ImportJob::RawSheets, mode);

    let root = as_object(document, "raw sheets document")?;
    let quarters = as_array(required(root, "quarters", "raw sheets document")?, "quarters")?;

    let mut tx = pool.begin().await?;
    let mut rows = 0u64;
    let mut cleared: HashSet<(SheetKind, String)> = HashSet::new();

    for quarter_block in quarters {
        let block = as_object(quarter_block, "quarter entry")?;
        let quarter = match required(block, "quarter", "quarter entry")? {
            Value::String(q) if !q.trim().is_empty() => q.trim().to_string(),
            other => {
                return Err(Error::MalformedInput(format!(
                    "quarter entry: 'quarter' must be a non-empty string, got {}",
                    other
                )))
            }
        };
        let sheets = as_object(required(block, "sheets", &quarter)?, &quarter)?;

        for (sheet_name, items) in sheets {
            let Some(kind) = SheetKind::from_sheet_name(sheet_name) else {
                warn!("Skipping unknown sheet '{}' in {}", sheet_name, quarter);
                continue;
            };
            let items = as_array(items, &format!("{} / {}", quarter, sheet_name))?;

            if mode == ImportMode::Replace && cleared.insert((kind, quarter.clone())) {
                sqlx::query(&format!("DELETE FROM {} WHERE quarter = ?", kind.table_name()))
                    .bind(&quarter)
                    .execute(&mut *tx)
                    .await?;
            }

            let inserted = insert_sheet(&mut tx, kind, &quarter, items).await?;
            debug!("{} / {}: {} rows", quarter, sheet_name, inserted);
            rows += inserted;
        }
    }

    let summary = recorder.finish(&mut tx, rows).await?;
    tx.commit().await?;
    log_committed(&summary);

    Ok(summary)
}

async fn insert_sheet(
    conn: &mut SqliteConnection,
    kind: SheetKind,
    quarter: &str,
    items: &[Value],
) -> Result<u64> {
    match kind {
        SheetKind::Orientasi => insert_items::<Orientation>(conn, kind, quarter, items).await,
        SheetKind::Pelaksanaan => insert_items::<Execution>(conn, kind, quarter, items).await,
        SheetKind::Kinerja => insert_items::<Performance>(conn, kind, quarter, items).await,
        SheetKind::EvaluasiKinerja => insert_items::<Evaluation>(conn, kind, quarter, items).await,
        SheetKind::Pengembangan => insert_items::<Development>(conn, kind, quarter, items).await,
        SheetKind::Project => insert_items::<Project>(conn, kind, quarter, items).await,
    }
}

async fn insert_items<T: TableSchema>(
    conn: &mut SqliteConnection,
    kind: SheetKind,
    quarter: &str,
    items: &[Value],
) -> Result<u64> {
    let context = format!("{} / {}", quarter, kind.sheet_name());
    let columns = T::expected_columns();

    for item in items {
        let record = as_object(item, &context)?;
        let filtered = T::filter_known_fields(record);

        let mut row: Vec<(String, SqlValue)> = Vec::with_capacity(filtered.len() + 2);
        row.push(("quarter".into(), quarter.into()));
        row.push(("sheet".into(), kind.sheet_name().into()));
        for column in &columns {
            if let Some(value) = filtered.get(column.name) {
                row.push((column.name.to_string(), typed_value(column, value, &context)));
            }
        }

        insert_row(conn, T::table_name(), row).await?;
    }

    Ok(items.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_round_trip() {
        for kind in SheetKind::ALL {
            assert_eq!(SheetKind::from_sheet_name(kind.sheet_name()), Some(kind));
        }
        assert_eq!(SheetKind::from_sheet_name("evaluasi"), None);
    }

    #[test]
    fn test_sheet_tables() {
        assert_eq!(SheetKind::EvaluasiKinerja.sheet_name(), "evaluasi kinerja");
        assert_eq!(SheetKind::EvaluasiKinerja.table_name(), "evaluasi_kinerja");
        assert_eq!(SheetKind::Pelaksanaan.table_name(), "pelaksanaan");
    }
}
