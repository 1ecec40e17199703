//! Evaluation-prediction import
//!
//! One meta document scoped to a (quarter, year) period, plus the list of
//! per-employee predictions for it. The `predictions` blob is kept whole;
//! quadrant and confidence are also extracted so they can be queried.

use super::{
    as_array, as_object, check_typed, insert_row, load_json_document, log_committed, required,
    typed_fields, ImportJob, ImportMode, ImportRunRecorder, ImportSummary, SqlValue,
};
use crate::db::models::{EvaluationPrediction, EvaluationPredictionMeta};
use crate::db::TableSchema;
use crate::{Error, Result};
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// A prediction period
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Period {
    quarter: String,
    year: i64,
}

impl Period {
    fn from_record(record: &Map<String, Value>, context: &str) -> Result<Self> {
        let quarter = match required(record, "prediction_quarter", context)? {
            Value::String(q) if !q.trim().is_empty() => q.trim().to_string(),
            other => {
                return Err(Error::MalformedInput(format!(
                    "{}: 'prediction_quarter' must be a non-empty string, got {}",
                    context, other
                )))
            }
        };
        let year = parse_year(required(record, "prediction_year", context)?)
            .ok_or_else(|| Error::MalformedInput(format!("{}: 'prediction_year' is not a year", context)))?;

        Ok(Self { quarter, year })
    }
}

/// Years arrive as numbers, occasionally as numeric strings
fn parse_year(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Nested `models.<kind>.name`
fn model_name(models: &Map<String, Value>, kind: &str) -> Result<String> {
    let context = format!("evaluation meta models.{}", kind);
    let model = as_object(required(models, kind, "evaluation meta models")?, &context)?;
    match required(model, "name", &context)? {
        Value::String(name) => Ok(name.clone()),
        other => Err(Error::MalformedInput(format!(
            "{}: 'name' must be a string, got {}",
            context, other
        ))),
    }
}

pub async fn import_evaluation_predictions_files(
    pool: &SqlitePool,
    meta_path: &Path,
    predictions_path: &Path,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let meta = load_json_document(meta_path)?;
    let predictions = load_json_document(predictions_path)?;
    import_evaluation_predictions(pool, &meta, &predictions, mode).await
}

pub async fn import_evaluation_predictions(
    pool: &SqlitePool,
    meta: &Value,
    predictions: &Value,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let recorder = ImportRunRecorder::start(ImportJob::EvaluationPrediction, mode);

    let meta = as_object(meta, "evaluation meta")?;
    let meta_period = Period::from_record(meta, "evaluation meta")?;
    let generated_date = SqlValue::from(required(meta, "generated_date", "evaluation meta")?);
    let models_value = required(meta, "models", "evaluation meta")?;
    let models = as_object(models_value, "evaluation meta models")?;
    let best_regressor = model_name(models, "regression")?;
    let best_classifier = model_name(models, "classification")?;

    // Validate every record before touching the store
    let records = as_array(predictions, "evaluation predictions")?;
    let mut parsed = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let context = format!("evaluation prediction #{}", index);
        let record = as_object(record, &context)?;
        let period = Period::from_record(record, &context)?;
        for key in ["predicted_kuadran", "prediction_confidence"] {
            let value = required(record, key, &context)?;
            check_typed::<EvaluationPrediction>(key, value, &context)?;
        }
        required(record, "predictions", &context)?;
        parsed.push((period, record));
    }

    let mut tx = pool.begin().await?;

    if mode == ImportMode::Replace {
        let mut periods: BTreeSet<&Period> = parsed.iter().map(|(p, _)| p).collect();
        periods.insert(&meta_period);
        for period in periods {
            clear_period(&mut tx, period).await?;
        }
    }

    insert_row(
        &mut tx,
        EvaluationPredictionMeta::table_name(),
        vec![
            ("prediction_quarter".into(), meta_period.quarter.as_str().into()),
            ("prediction_year".into(), meta_period.year.into()),
            ("generated_date".into(), generated_date),
            ("best_regressor".into(), best_regressor.into()),
            ("best_classifier".into(), best_classifier.into()),
            ("model_metrics".into(), SqlValue::json(Some(models_value))),
        ],
    )
    .await?;
    let mut rows = 1u64;

    for (period, record) in &parsed {
        insert_prediction(&mut tx, period, record).await?;
        rows += 1;
    }
    debug!(
        "{} {}: {} predictions",
        meta_period.quarter,
        meta_period.year,
        parsed.len()
    );

    let summary = recorder.finish(&mut tx, rows).await?;
    tx.commit().await?;
    log_committed(&summary);

    Ok(summary)
}

async fn clear_period(conn: &mut SqliteConnection, period: &Period) -> Result<()> {
    for table in [
        EvaluationPredictionMeta::table_name(),
        EvaluationPrediction::table_name(),
    ] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE prediction_quarter = ? AND prediction_year = ?",
            table
        ))
        .bind(&period.quarter)
        .bind(period.year)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_prediction(
    conn: &mut SqliteConnection,
    period: &Period,
    record: &Map<String, Value>,
) -> Result<()> {
    let context = format!("{} {}", period.quarter, period.year);
    let mut row = typed_fields::<EvaluationPrediction>(
        record,
        &["nik", "name", "predicted_kuadran", "prediction_confidence"],
        &context,
    );
    row.extend([
        ("prediction_quarter".to_string(), SqlValue::from(period.quarter.as_str())),
        ("prediction_year".to_string(), SqlValue::from(period.year)),
        ("predictions_json".to_string(), SqlValue::json(record.get("predictions"))),
        ("raw_json".to_string(), SqlValue::Text(Value::Object(record.clone()).to_string())),
    ]);

    insert_row(conn, EvaluationPrediction::table_name(), row).await?;
    Ok(())
}
