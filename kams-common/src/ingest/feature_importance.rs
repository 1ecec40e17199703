//! Feature-importance import
//!
//! Input maps each pipeline phase to its run:
//!
//! ```json
//! {
//!   "orientasi_to_pelaksanaan": {
//!     "phase_config": {...},
//!     "best_regressor": "XGBRegressor",
//!     "metrics_overall": {...},
//!     "metrics_by_quarter": {...},
//!     "features_overall": [{"feature": "solution", "importance": 0.31, "description": "..."}],
//!     "features_by_quarter": {"Q1 2025": [...]}
//!   }
//! }
//! ```
//!
//! Each phase becomes one `fi_meta` row; overall features are tagged with
//! quarter `ALL`, per-quarter features with their quarter. The meta row is
//! inserted first so its id is known when the features reference it.

use super::{
    feature_importance_meta_kind, insert_row, load_json_document, log_committed, set_current_meta,
    ImportJob, ImportMode, ImportRunRecorder, ImportSummary, SqlValue,
};
use crate::db::models::{FeatureImportance, FeatureImportanceMeta, ALL_QUARTERS};
use crate::db::TableSchema;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One phase of the input document
#[derive(Debug, Deserialize)]
pub struct PhaseDocument {
    pub phase_config: Option<Value>,
    pub best_regressor: Option<String>,
    pub metrics_overall: Option<Value>,
    pub metrics_by_quarter: Option<Value>,
    #[serde(default)]
    pub features_overall: Vec<FeatureEntry>,
    #[serde(default)]
    pub features_by_quarter: BTreeMap<String, Vec<FeatureEntry>>,
}

/// One ranked feature
#[derive(Debug, Deserialize)]
pub struct FeatureEntry {
    pub feature: String,
    pub importance: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rank: Option<i64>,
}

/// Parse the whole document up front so a bad phase fails before any insert
///
/// Phase and quarter keys are trimmed. Quarter keys that collapse onto the
/// same token are merged; two phases that do are an error.
pub fn parse_document(document: &Value) -> Result<BTreeMap<String, PhaseDocument>> {
    let Value::Object(document) = document else {
        return Err(Error::MalformedInput(
            "feature importance document: expected a JSON object".to_string(),
        ));
    };

    let mut phases = BTreeMap::new();
    for (key, value) in document {
        let phase = key.trim();
        if phase.is_empty() {
            return Err(Error::MalformedInput(
                "feature importance document: empty phase key".to_string(),
            ));
        }
        let mut content: PhaseDocument = serde_json::from_value(value.clone())
            .map_err(|e| Error::MalformedInput(format!("feature importance phase '{}': {}", phase, e)))?;

        let mut by_quarter: BTreeMap<String, Vec<FeatureEntry>> = BTreeMap::new();
        for (quarter, entries) in std::mem::take(&mut content.features_by_quarter) {
            let quarter = quarter.trim();
            if quarter.is_empty() || quarter == ALL_QUARTERS {
                return Err(Error::MalformedInput(format!(
                    "feature importance phase '{}': quarter key '{}' is empty or reserved for the overall ranking",
                    phase, quarter
                )));
            }
            by_quarter.entry(quarter.to_string()).or_default().extend(entries);
        }
        content.features_by_quarter = by_quarter;

        if phases.insert(phase.to_string(), content).is_some() {
            return Err(Error::MalformedInput(format!(
                "feature importance document: phase '{}' appears more than once",
                phase
            )));
        }
    }

    Ok(phases)
}

pub async fn import_feature_importance_file(
    pool: &SqlitePool,
    path: &Path,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let document = load_json_document(path)?;
    import_feature_importance(pool, &document, mode).await
}

pub async fn import_feature_importance(
    pool: &SqlitePool,
    document: &Value,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let recorder = ImportRunRecorder::start(ImportJob::FeatureImportance, mode);
    let phases = parse_document(document)?;

    let mut tx = pool.begin().await?;
    let mut rows = 0u64;

    for (phase, content) in &phases {
        if mode == ImportMode::Replace {
            // Cascades to fi_features
            let deleted = sqlx::query("DELETE FROM fi_meta WHERE phase = ?")
                .bind(phase)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!("Replaced {} previous run(s) of phase '{}'", deleted, phase);
        }

        rows += insert_phase(&mut tx, phase, content).await?;
    }

    let summary = recorder.finish(&mut tx, rows).await?;
    tx.commit().await?;
    log_committed(&summary);

    Ok(summary)
}

async fn insert_phase(conn: &mut SqliteConnection, phase: &str, content: &PhaseDocument) -> Result<u64> {
    let meta_id = insert_row(
        conn,
        FeatureImportanceMeta::table_name(),
        vec![
            ("phase".into(), phase.into()),
            ("phase_config".into(), SqlValue::json(content.phase_config.as_ref())),
            ("best_regressor".into(), content.best_regressor.clone().into()),
            ("metrics_overall".into(), SqlValue::json(content.metrics_overall.as_ref())),
            ("metrics_by_quarter".into(), SqlValue::json(content.metrics_by_quarter.as_ref())),
        ],
    )
    .await?;
    set_current_meta(conn, &feature_importance_meta_kind(phase), meta_id).await?;

    let mut rows = 1u64;
    for entry in &content.features_overall {
        insert_feature(conn, meta_id, phase, ALL_QUARTERS, entry).await?;
        rows += 1;
    }
    for (quarter, entries) in &content.features_by_quarter {
        for entry in entries {
            insert_feature(conn, meta_id, phase, quarter, entry).await?;
            rows += 1;
        }
    }

    debug!("Phase '{}': meta {} with {} features", phase, meta_id, rows - 1);
    Ok(rows)
}

async fn insert_feature(
    conn: &mut SqliteConnection,
    meta_id: i64,
    phase: &str,
    quarter: &str,
    entry: &FeatureEntry,
) -> Result<()> {
    insert_row(
        conn,
        FeatureImportance::table_name(),
        vec![
            ("meta_id".into(), meta_id.into()),
            ("phase".into(), phase.into()),
            ("quarter".into(), quarter.into()),
            ("feature".into(), entry.feature.as_str().into()),
            ("importance".into(), entry.importance.into()),
            (
                "description".into(),
                entry.description.clone().unwrap_or_default().into(),
            ),
            ("rank".into(), entry.rank.into()),
        ],
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_requires_feature_and_importance() {
        let doc = json!({ "p1": { "features_overall": [{ "feature": "solution" }] } });
        assert!(matches!(parse_document(&doc), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_parse_defaults_missing_lists() {
        let doc = json!({ "p1": { "best_regressor": "Ridge" } });
        let phases = parse_document(&doc).unwrap();
        assert!(phases["p1"].features_overall.is_empty());
        assert!(phases["p1"].features_by_quarter.is_empty());
    }

    #[test]
    fn test_parse_rejects_phases_equal_after_trimming() {
        let doc = json!({ "p1": {}, " p1": {} });
        assert!(matches!(parse_document(&doc), Err(Error::MalformedInput(m)) if m.contains("more than once")));
    }

    #[test]
    fn test_parse_rejects_reserved_quarter_key() {
        let doc = json!({ "p1": { "features_by_quarter": { "ALL": [] } } });
        assert!(matches!(parse_document(&doc), Err(Error::MalformedInput(m)) if m.contains("reserved")));
    }
}
