//! `{meta, data}` envelopes for prediction-bearing records
//!
//! Win-probability and feature-importance meta are resolved through the
//! `current_meta` pointer the loader maintains. Evaluation-prediction meta
//! is resolved by its (quarter, year) period.

use crate::db::{fetch_records, RecordFilter};
use kams_common::db::{
    EvaluationPrediction, EvaluationPredictionMeta, FeatureImportance, FeatureImportanceMeta,
    WinProbabilityMeta, WinProbabilityPrediction,
};
use kams_common::ingest::{feature_importance_meta_kind, WIN_PROBABILITY_META_KIND};
use kams_common::{Error, Result};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<M, D> {
    pub meta: M,
    pub data: D,
}

/// Best model of the current win-probability run and its own metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinProbabilityMetaView {
    pub best_model: Option<String>,
    /// `null` when the metrics blob has no entry for the best model
    pub metrics: Value,
}

impl From<&WinProbabilityMeta> for WinProbabilityMetaView {
    fn from(meta: &WinProbabilityMeta) -> Self {
        let metrics = match (&meta.best_model_name, &meta.metrics) {
            (Some(best), Some(all)) => all.0.get(best).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Self {
            best_model: meta.best_model_name.clone(),
            metrics,
        }
    }
}

pub async fn current_win_probability_meta(pool: &SqlitePool) -> Result<Option<WinProbabilityMeta>> {
    let meta: Option<WinProbabilityMeta> = sqlx::query_as(
        r#"
        SELECT m.* FROM wp_meta m
        JOIN current_meta c ON c.meta_id = m.id
        WHERE c.kind = ?
        "#,
    )
    .bind(WIN_PROBABILITY_META_KIND)
    .fetch_optional(pool)
    .await?;
    Ok(meta)
}

/// Predictions matching `filter`, with the current model meta (or `null`)
pub async fn win_probability_envelope(
    pool: &SqlitePool,
    filter: &RecordFilter,
) -> Result<Envelope<Option<WinProbabilityMetaView>, Vec<WinProbabilityPrediction>>> {
    let meta = current_win_probability_meta(pool).await?;
    let data = fetch_records::<WinProbabilityPrediction>(pool, filter).await?;
    Ok(Envelope {
        meta: meta.as_ref().map(WinProbabilityMetaView::from),
        data,
    })
}

/// Meta of one evaluation-prediction period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationMetaView {
    pub quarter: String,
    pub year: i64,
    pub generated_date: Option<String>,
    pub best_regressor: Option<String>,
    pub best_classifier: Option<String>,
    pub metrics: Option<Value>,
}

impl From<EvaluationPredictionMeta> for EvaluationMetaView {
    fn from(meta: EvaluationPredictionMeta) -> Self {
        Self {
            quarter: meta.prediction_quarter,
            year: meta.prediction_year,
            generated_date: meta.generated_date,
            best_regressor: meta.best_regressor,
            best_classifier: meta.best_classifier,
            metrics: meta.model_metrics.map(|m| m.0),
        }
    }
}

/// The stored input record, or a reconstruction when it was not kept
fn prediction_item(prediction: EvaluationPrediction) -> Value {
    match prediction.raw_json {
        Some(raw) => raw.0,
        None => json!({
            "nik": prediction.nik,
            "name": prediction.name,
            "predicted_kuadran": prediction.predicted_kuadran,
            "prediction_confidence": prediction.prediction_confidence,
            "predictions": prediction.predictions_json.map(|p| p.0),
        }),
    }
}

/// Latest meta imported for (quarter, year)
pub async fn evaluation_meta_for_period(
    pool: &SqlitePool,
    quarter: &str,
    year: i64,
) -> Result<Option<EvaluationPredictionMeta>> {
    let meta: Option<EvaluationPredictionMeta> = sqlx::query_as(
        r#"
        SELECT * FROM ep_meta
        WHERE prediction_quarter = ? AND prediction_year = ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(quarter)
    .bind(year)
    .fetch_optional(pool)
    .await?;
    Ok(meta)
}

/// One employee's prediction for a period
///
/// Both the period meta and the employee's row must exist; otherwise the
/// whole result is `NotFound`.
pub async fn evaluation_prediction_detail(
    pool: &SqlitePool,
    nik: i64,
    quarter: &str,
    year: i64,
) -> Result<Envelope<EvaluationMetaView, Vec<Value>>> {
    let prediction: Option<EvaluationPrediction> = sqlx::query_as(
        r#"
        SELECT * FROM ep_predictions
        WHERE nik = ? AND prediction_quarter = ? AND prediction_year = ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(nik)
    .bind(quarter)
    .bind(year)
    .fetch_optional(pool)
    .await?;
    let meta = evaluation_meta_for_period(pool, quarter, year).await?;

    match (meta, prediction) {
        (Some(meta), Some(prediction)) => Ok(Envelope {
            meta: meta.into(),
            data: vec![prediction_item(prediction)],
        }),
        _ => Err(Error::NotFound(
            "Prediction not found for this AE and period".to_string(),
        )),
    }
}

/// Every prediction of a period; `NotFound` when the period has no meta
pub async fn evaluation_predictions_for_period(
    pool: &SqlitePool,
    quarter: &str,
    year: i64,
) -> Result<Envelope<EvaluationMetaView, Vec<Value>>> {
    let meta = evaluation_meta_for_period(pool, quarter, year)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No evaluation predictions for {} {}", quarter, year)))?;

    let predictions: Vec<EvaluationPrediction> = sqlx::query_as(
        r#"
        SELECT * FROM ep_predictions
        WHERE prediction_quarter = ? AND prediction_year = ?
        ORDER BY id
        "#,
    )
    .bind(quarter)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(Envelope {
        meta: meta.into(),
        data: predictions.into_iter().map(prediction_item).collect(),
    })
}

pub async fn current_feature_importance_meta(
    pool: &SqlitePool,
    phase: &str,
) -> Result<Option<FeatureImportanceMeta>> {
    let meta: Option<FeatureImportanceMeta> = sqlx::query_as(
        r#"
        SELECT m.* FROM fi_meta m
        JOIN current_meta c ON c.meta_id = m.id
        WHERE c.kind = ?
        "#,
    )
    .bind(feature_importance_meta_kind(phase))
    .fetch_optional(pool)
    .await?;
    Ok(meta)
}

/// Current run of `phase` with its features for exactly `quarter`
///
/// `ALL` selects the overall ranking only; a quarter never includes it.
pub async fn feature_importance_envelope(
    pool: &SqlitePool,
    phase: &str,
    quarter: &str,
) -> Result<Envelope<FeatureImportanceMeta, Vec<FeatureImportance>>> {
    let meta = current_feature_importance_meta(pool, phase)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Phase not found: {}", phase)))?;

    let data: Vec<FeatureImportance> = sqlx::query_as(
        r#"
        SELECT * FROM fi_features
        WHERE meta_id = ? AND quarter = ?
        ORDER BY id
        "#,
    )
    .bind(meta.id)
    .bind(quarter)
    .fetch_all(pool)
    .await?;

    Ok(Envelope { meta, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kams_common::db::init_memory_database;
    use kams_common::ingest::{
        import_evaluation_predictions, import_feature_importance, import_win_probability,
        ImportMode,
    };
    use sqlx::types::Json;

    fn wp_meta(best: Option<&str>, metrics: Option<Value>) -> WinProbabilityMeta {
        WinProbabilityMeta {
            id: 1,
            best_model_name: best.map(str::to_string),
            metrics: metrics.map(Json),
            imported_at: "2025-10-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_wp_view_picks_best_model_metrics() {
        let meta = wp_meta(
            Some("RandomForest"),
            Some(json!({ "RandomForest": { "auc": 0.88 }, "LogReg": { "auc": 0.79 } })),
        );
        let view = WinProbabilityMetaView::from(&meta);
        assert_eq!(view.best_model.as_deref(), Some("RandomForest"));
        assert_eq!(view.metrics, json!({ "auc": 0.88 }));
    }

    #[test]
    fn test_wp_view_missing_model_key_is_null() {
        let meta = wp_meta(Some("XGB"), Some(json!({ "RandomForest": {} })));
        assert_eq!(WinProbabilityMetaView::from(&meta).metrics, Value::Null);
        assert_eq!(WinProbabilityMetaView::from(&wp_meta(None, None)).metrics, Value::Null);
    }

    #[test]
    fn test_prediction_item_reconstructed_without_raw() {
        let prediction = EvaluationPrediction {
            id: 1,
            nik: Some(920001),
            name: Some("Ali Rahman".into()),
            prediction_quarter: "Q4".into(),
            prediction_year: 2025,
            predicted_kuadran: Some(2),
            prediction_confidence: Some(0.67),
            predictions_json: Some(Json(json!({ "revenue": 0.93 }))),
            raw_json: None,
        };
        let item = prediction_item(prediction);
        assert_eq!(item["nik"], json!(920001));
        assert_eq!(item["predicted_kuadran"], json!(2));
        assert_eq!(item["predictions"], json!({ "revenue": 0.93 }));
    }

    #[tokio::test]
    async fn test_wp_meta_follows_pointer() {
        let pool = init_memory_database().await.unwrap();
        assert!(current_win_probability_meta(&pool).await.unwrap().is_none());

        let predictions = json!({ "Q1 2025": [{ "lop_id": "LOP-001" }] });
        import_win_probability(&pool, &predictions, &json!({ "best_model_name": "A" }), ImportMode::Append)
            .await
            .unwrap();
        import_win_probability(&pool, &predictions, &json!({ "best_model_name": "B" }), ImportMode::Append)
            .await
            .unwrap();

        let envelope = win_probability_envelope(&pool, &RecordFilter::default()).await.unwrap();
        assert_eq!(envelope.meta.unwrap().best_model.as_deref(), Some("B"));
        assert_eq!(envelope.data.len(), 2);
    }

    #[tokio::test]
    async fn test_fi_quarter_is_exact() {
        let pool = init_memory_database().await.unwrap();
        let document = json!({
            "p1": {
                "features_overall": [{ "feature": "a", "importance": 0.5 }],
                "features_by_quarter": { "Q1 2025": [{ "feature": "b", "importance": 0.4 }] }
            }
        });
        import_feature_importance(&pool, &document, ImportMode::Append).await.unwrap();

        let all = feature_importance_envelope(&pool, "p1", "ALL").await.unwrap();
        assert_eq!(all.data.len(), 1);
        assert_eq!(all.data[0].feature, "a");

        let q1 = feature_importance_envelope(&pool, "p1", "Q1 2025").await.unwrap();
        assert_eq!(q1.data.len(), 1);
        assert_eq!(q1.data[0].feature, "b");

        let none = feature_importance_envelope(&pool, "p1", "Q2 2025").await.unwrap();
        assert!(none.data.is_empty());

        let missing = feature_importance_envelope(&pool, "p2", "ALL").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fi_reimport_serves_latest_run_only() {
        let pool = init_memory_database().await.unwrap();
        let first = json!({ "p1": { "features_overall": [{ "feature": "old", "importance": 0.1 }] } });
        let second = json!({ "p1": { "features_overall": [{ "feature": "new", "importance": 0.2 }] } });
        import_feature_importance(&pool, &first, ImportMode::Append).await.unwrap();
        import_feature_importance(&pool, &second, ImportMode::Append).await.unwrap();

        let envelope = feature_importance_envelope(&pool, "p1", "ALL").await.unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.data[0].feature, "new");
    }

    #[tokio::test]
    async fn test_ep_detail_requires_meta_and_row() {
        let pool = init_memory_database().await.unwrap();
        let meta = json!({
            "prediction_quarter": "Q4",
            "prediction_year": 2025,
            "generated_date": "2025-10-01",
            "models": { "regression": { "name": "R" }, "classification": { "name": "C" } }
        });
        let rows = json!([{
            "nik": 920001,
            "prediction_quarter": "Q4",
            "prediction_year": 2025,
            "predicted_kuadran": 1,
            "prediction_confidence": 0.9,
            "predictions": {}
        }]);
        import_evaluation_predictions(&pool, &meta, &rows, ImportMode::Append)
            .await
            .unwrap();

        let found = evaluation_prediction_detail(&pool, 920001, "Q4", 2025).await.unwrap();
        assert_eq!(found.meta.best_regressor.as_deref(), Some("R"));
        assert_eq!(found.data.len(), 1);

        let other_nik = evaluation_prediction_detail(&pool, 1, "Q4", 2025).await;
        assert!(matches!(other_nik, Err(Error::NotFound(_))));
        let other_year = evaluation_prediction_detail(&pool, 920001, "Q4", 2026).await;
        assert!(matches!(other_year, Err(Error::NotFound(_))));
    }
}
