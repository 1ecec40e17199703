//! Win-probability import
//!
//! Predictions arrive grouped by quarter (`{"Q1 2025": [{...}, ...]}`), plus
//! one model meta document (`{"best_model_name": ..., "metrics": {...}}`).
//! Prediction fields are extracted one by one; a missing key, or a value its
//! column cannot hold, is stored as NULL rather than failing the job. Predictions and meta commit together.

use super::{
    as_array, as_object, insert_row, load_json_document, log_committed, set_current_meta,
    typed_fields, ImportJob, ImportMode, ImportRunRecorder, ImportSummary, SqlValue,
    WIN_PROBABILITY_META_KIND,
};
use crate::db::models::{WinProbabilityMeta, WinProbabilityPrediction};
use crate::db::TableSchema;
use crate::Result;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::debug;

/// Scalar prediction fields copied from each record
const PREDICTION_FIELDS: [&str; 13] = [
    "nik",
    "name",
    "unit",
    "lop_id",
    "project_name",
    "customer_name",
    "stage",
    "status",
    "value_projects",
    "jumlah_aktivitas",
    "win_probability",
    "win_probability_pct",
    "predicted_class",
];

/// Factor lists, stored as JSON
const FACTOR_FIELDS: [&str; 2] = ["top_positive_factors", "top_negative_factors"];

pub async fn import_win_probability_files(
    pool: &SqlitePool,
    predictions_path: &Path,
    meta_path: &Path,
    mode: ImportMode,
) -> Result<ImportSummary> {
    // Both files must be readable before anything is written
    let predictions = load_json_document(predictions_path)?;
    let meta = load_json_document(meta_path)?;
    import_win_probability(pool, &predictions, &meta, mode).await
}

pub async fn import_win_probability(
    pool: &SqlitePool,
    predictions: &Value,
    meta: &Value,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let recorder = ImportRunRecorder::start(ImportJob::WinProbability, mode);

    let by_quarter = as_object(predictions, "win probability predictions")?;
    let meta = as_object(meta, "win probability meta")?;

    let mut tx = pool.begin().await?;
    let mut rows = 0u64;

    for (quarter, records) in by_quarter {
        let quarter = quarter.trim();
        let records = as_array(records, quarter)?;

        if mode == ImportMode::Replace {
            sqlx::query("DELETE FROM wp_predictions WHERE quarter = ?")
                .bind(quarter)
                .execute(&mut *tx)
                .await?;
        }

        for record in records {
            let record = as_object(record, quarter)?;
            insert_prediction(&mut tx, quarter, record).await?;
            rows += 1;
        }
        debug!("{}: {} predictions", quarter, records.len());
    }

    let meta_id = insert_row(
        &mut tx,
        WinProbabilityMeta::table_name(),
        typed_fields::<WinProbabilityMeta>(meta, &["best_model_name"], "win probability meta")
            .into_iter()
            .chain([
                ("metrics".to_string(), SqlValue::json(meta.get("metrics"))),
                ("imported_at".to_string(), SqlValue::from(Utc::now().to_rfc3339())),
            ])
            .collect(),
    )
    .await?;
    set_current_meta(&mut tx, WIN_PROBABILITY_META_KIND, meta_id).await?;
    rows += 1;

    let summary = recorder.finish(&mut tx, rows).await?;
    tx.commit().await?;
    log_committed(&summary);

    Ok(summary)
}

async fn insert_prediction(
    conn: &mut SqliteConnection,
    quarter: &str,
    record: &Map<String, Value>,
) -> Result<()> {
    let mut row: Vec<(String, SqlValue)> = vec![("quarter".into(), quarter.into())];
    row.extend(typed_fields::<WinProbabilityPrediction>(
        record,
        &PREDICTION_FIELDS,
        quarter,
    ));
    for field in FACTOR_FIELDS {
        row.push((field.to_string(), SqlValue::json(record.get(field))));
    }

    insert_row(conn, WinProbabilityPrediction::table_name(), row).await?;
    Ok(())
}
