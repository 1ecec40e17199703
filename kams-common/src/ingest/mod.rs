//! Batch ingestion of the modelling pipeline's JSON artifacts
//!
//! Four independent jobs, each run inside one transaction:
//! - feature importance (phase meta + ranked features)
//! - raw sheets (the six quarterly HR sheets)
//! - win probability (predictions by quarter + one model meta)
//! - evaluation prediction (period meta + per-employee predictions)
//!
//! A job either commits every row it built or none of them. Jobs append by
//! default, so running one twice against the same store duplicates its rows;
//! [`ImportMode::Replace`] clears the job's natural scope first instead.

use crate::db::{ColumnDefinition, TableSchema};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

pub mod evaluation_prediction;
pub mod feature_importance;
pub mod raw_sheets;
pub mod win_probability;

pub use evaluation_prediction::{import_evaluation_predictions, import_evaluation_predictions_files};
pub use feature_importance::{import_feature_importance, import_feature_importance_file};
pub use raw_sheets::{import_raw_sheets, import_raw_sheets_file, SheetKind};
pub use win_probability::{import_win_probability, import_win_probability_files};

/// Default artifact file names inside the data directory
pub const FEATURE_IMPORTANCE_FILE: &str = "fi_results_v17_normalized.json";
pub const RAW_SHEETS_FILE: &str = "input_data_all_quarters.json";
pub const WP_PREDICTIONS_FILE: &str = "winprob_predictions_by_quarter.json";
pub const WP_META_FILE: &str = "winprob_model_meta.json";
pub const EP_META_PREFIX: &str = "evaluation__meta__";
pub const EP_PREDICTIONS_PREFIX: &str = "evaluation__predictions__";

/// How a job treats rows already in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Insert alongside existing rows (re-runs duplicate data)
    #[default]
    Append,
    /// Delete rows sharing the job's natural scope, then insert
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Append => "append",
            ImportMode::Replace => "replace",
        }
    }
}

/// The four batch jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportJob {
    FeatureImportance,
    RawSheets,
    WinProbability,
    EvaluationPrediction,
}

impl ImportJob {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportJob::FeatureImportance => "feature_importance",
            ImportJob::RawSheets => "raw_sheets",
            ImportJob::WinProbability => "win_probability",
            ImportJob::EvaluationPrediction => "evaluation_prediction",
        }
    }
}

impl fmt::Display for ImportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one committed job
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub run_id: Uuid,
    pub job: ImportJob,
    pub mode: ImportMode,
    /// Rows inserted, meta rows included
    pub rows: u64,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows ({}, run {})",
            self.job,
            self.rows,
            self.mode.as_str(),
            self.run_id
        )
    }
}

/// Read and parse one input document
pub fn load_json_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Scalar ready to bind into an INSERT
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Value destined for a TEXT column holding a JSON document
    pub(crate) fn json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => SqlValue::Null,
            Some(v) => SqlValue::Text(v.to_string()),
        }
    }
}

impl SqlValue {
    /// Convert `value` to the storage class of a column declared `sql_type`
    ///
    /// `None` when the column cannot hold it faithfully, such as `"-"` in a
    /// REAL column or `2.5` in an INTEGER one. Numeric strings are parsed;
    /// blank strings in numeric columns are empty cells and become NULL.
    pub(crate) fn coerce(value: &Value, sql_type: &str) -> Option<Self> {
        match (sql_type, value) {
            (_, Value::Null) => Some(SqlValue::Null),
            ("INTEGER", Value::Bool(b)) => Some(SqlValue::Integer(i64::from(*b))),
            ("INTEGER", Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(SqlValue::Integer),
            ("INTEGER", Value::String(s)) => numeric_text(s, |t| {
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().and_then(integral))
                    .map(SqlValue::Integer)
            }),
            ("REAL", Value::Bool(b)) => Some(SqlValue::Real(if *b { 1.0 } else { 0.0 })),
            ("REAL", Value::Number(n)) => n.as_f64().map(SqlValue::Real),
            ("REAL", Value::String(s)) => numeric_text(s, |t| {
                t.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(SqlValue::Real)
            }),
            ("INTEGER" | "REAL", _) => None,
            (_, Value::String(s)) => Some(SqlValue::Text(s.clone())),
            (_, other) => Some(SqlValue::Text(other.to_string())),
        }
    }
}

fn numeric_text(text: &str, parse: impl FnOnce(&str) -> Option<SqlValue>) -> Option<SqlValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Some(SqlValue::Null)
    } else {
        parse(trimmed)
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e18).then_some(f as i64)
}

/// Bind value for `column`; anything it cannot hold is stored as NULL
pub(crate) fn typed_value(column: &ColumnDefinition, value: &Value, context: &str) -> SqlValue {
    SqlValue::coerce(value, column.sql_type).unwrap_or_else(|| {
        warn!(
            "{}: {} column '{}' cannot hold {}, storing NULL",
            context, column.sql_type, column.name, value
        );
        SqlValue::Null
    })
}

/// Typed values for `fields` of `record` in table `T`; absent keys are NULL
pub(crate) fn typed_fields<T: TableSchema>(
    record: &Map<String, Value>,
    fields: &[&str],
    context: &str,
) -> Vec<(String, SqlValue)> {
    T::expected_columns()
        .iter()
        .filter(|column| fields.contains(&column.name))
        .map(|column| {
            let value = record.get(column.name).unwrap_or(&Value::Null);
            (column.name.to_string(), typed_value(column, value, context))
        })
        .collect()
}

/// Fail the job when a required field does not fit its column in table `T`
pub(crate) fn check_typed<T: TableSchema>(key: &str, value: &Value, context: &str) -> Result<()> {
    let fits = T::expected_columns()
        .iter()
        .find(|column| column.name == key)
        .map_or(true, |column| SqlValue::coerce(value, column.sql_type).is_some());
    if fits {
        Ok(())
    } else {
        Err(Error::MalformedInput(format!(
            "{}: '{}' has an unusable value {}",
            context, key, value
        )))
    }
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            nested => SqlValue::Text(nested.to_string()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Insert one row and return its identifier
///
/// Column names come from the schema registry or from code, never straight
/// from input documents.
pub(crate) async fn insert_row(
    conn: &mut SqliteConnection,
    table: &str,
    row: Vec<(String, SqlValue)>,
) -> Result<i64> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!("INSERT INTO {} (", table));
    {
        let mut columns = builder.separated(", ");
        for (column, _) in &row {
            columns.push(column);
        }
    }
    builder.push(") VALUES (");
    {
        let mut values = builder.separated(", ");
        for (_, value) in row {
            match value {
                SqlValue::Null => values.push_bind(None::<String>),
                SqlValue::Integer(i) => values.push_bind(i),
                SqlValue::Real(r) => values.push_bind(r),
                SqlValue::Text(s) => values.push_bind(s),
            };
        }
    }
    builder.push(")");

    let result = builder.build().execute(conn).await?;
    Ok(result.last_insert_rowid())
}

/// Point `kind` at a freshly inserted meta row
pub(crate) async fn set_current_meta(
    conn: &mut SqliteConnection,
    kind: &str,
    meta_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO current_meta (kind, meta_id, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(kind) DO UPDATE SET
            meta_id = excluded.meta_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(kind)
    .bind(meta_id)
    .bind(Utc::now().to_rfc3339())
    .execute(conn)
    .await?;
    Ok(())
}

/// Pointer key for the current meta of a feature-importance phase
pub fn feature_importance_meta_kind(phase: &str) -> String {
    format!("feature_importance:{}", phase)
}

/// Pointer key for the current win-probability meta
pub const WIN_PROBABILITY_META_KIND: &str = "win_probability";

/// Look up a key that must be present, or fail the job
pub(crate) fn required<'a>(
    record: &'a Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<&'a Value> {
    record
        .get(key)
        .ok_or_else(|| Error::MalformedInput(format!("{}: missing required key '{}'", context, key)))
}

pub(crate) fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::MalformedInput(format!("{}: expected a JSON object", context)))
}

pub(crate) fn as_array<'a>(value: &'a Value, context: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::MalformedInput(format!("{}: expected a JSON array", context)))
}

/// Bookkeeping for one job: identity, timing and the audit row
pub(crate) struct ImportRunRecorder {
    run_id: Uuid,
    job: ImportJob,
    mode: ImportMode,
    started_at: DateTime<Utc>,
}

impl ImportRunRecorder {
    pub(crate) fn start(job: ImportJob, mode: ImportMode) -> Self {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, mode = mode.as_str(), "Starting {} import", job);
        Self {
            run_id,
            job,
            mode,
            started_at: Utc::now(),
        }
    }

    /// Write the audit row; call inside the job's transaction, right before commit
    pub(crate) async fn finish(self, conn: &mut SqliteConnection, rows: u64) -> Result<ImportSummary> {
        sqlx::query(
            r#"
            INSERT INTO import_runs (run_id, job, mode, rows_inserted, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(self.run_id.to_string())
        .bind(self.job.as_str())
        .bind(self.mode.as_str())
        .bind(rows as i64)
        .bind(self.started_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(conn)
        .await?;

        Ok(ImportSummary {
            run_id: self.run_id,
            job: self.job,
            mode: self.mode,
            rows,
        })
    }
}

/// Log a committed job
pub(crate) fn log_committed(summary: &ImportSummary) {
    info!(run_id = %summary.run_id, "✓ {} import committed: {} rows", summary.job, summary.rows);
}

/// Evaluation-prediction file pairs found in `data_dir`
///
/// `evaluation__meta__<period>.json` is paired with
/// `evaluation__predictions__<period>.json`; a meta without its predictions
/// file is skipped.
pub fn find_evaluation_prediction_files(data_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(period) = file_name.strip_prefix(EP_META_PREFIX) else {
            continue;
        };
        let predictions = data_dir.join(format!("{}{}", EP_PREDICTIONS_PREFIX, period));
        if predictions.exists() {
            pairs.push((path.clone(), predictions));
        }
    }
    pairs.sort();

    Ok(pairs)
}

/// Run the standard bundle found in `data_dir`
///
/// Jobs are independent: a failing job is rolled back and reported, the
/// remaining jobs still run.
pub async fn import_all(
    pool: &SqlitePool,
    data_dir: &Path,
    mode: ImportMode,
) -> Vec<(ImportJob, Result<ImportSummary>)> {
    let mut outcomes = Vec::new();

    let result = import_feature_importance_file(pool, &data_dir.join(FEATURE_IMPORTANCE_FILE), mode).await;
    outcomes.push((ImportJob::FeatureImportance, result));

    let result = import_raw_sheets_file(pool, &data_dir.join(RAW_SHEETS_FILE), mode).await;
    outcomes.push((ImportJob::RawSheets, result));

    let result = import_win_probability_files(
        pool,
        &data_dir.join(WP_PREDICTIONS_FILE),
        &data_dir.join(WP_META_FILE),
        mode,
    )
    .await;
    outcomes.push((ImportJob::WinProbability, result));

    match find_evaluation_prediction_files(data_dir) {
        Ok(pairs) => {
            for (meta, predictions) in pairs {
                let result = import_evaluation_predictions_files(pool, &meta, &predictions, mode).await;
                outcomes.push((ImportJob::EvaluationPrediction, result));
            }
        }
        Err(e) => outcomes.push((ImportJob::EvaluationPrediction, Err(e))),
    }

    for (job, result) in &outcomes {
        if let Err(e) = result {
            error!("{} import failed and was rolled back: {}", job, e);
        }
    }

    outcomes
}
