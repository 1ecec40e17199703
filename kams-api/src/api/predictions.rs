//! Prediction endpoints: win probability, evaluation prediction, feature importance
//!
//! Each answers a `{meta, data}` envelope.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use kams_common::db::{FeatureImportance, FeatureImportanceMeta, WinProbabilityPrediction, ALL_QUARTERS};
use serde::Deserialize;
use serde_json::Value;

use super::error::{clean_quarter, parse_nik, ApiError};
use crate::db::RecordFilter;
use crate::envelope::{
    evaluation_prediction_detail, evaluation_predictions_for_period, feature_importance_envelope,
    win_probability_envelope, Envelope, EvaluationMetaView, WinProbabilityMetaView,
};
use crate::AppState;

type WinProbabilityResponse =
    Json<Envelope<Option<WinProbabilityMetaView>, Vec<WinProbabilityPrediction>>>;
type EvaluationResponse = Json<Envelope<EvaluationMetaView, Vec<Value>>>;
type FeatureImportanceResponse = Json<Envelope<FeatureImportanceMeta, Vec<FeatureImportance>>>;

async fn win_probability(state: &AppState, filter: RecordFilter) -> Result<WinProbabilityResponse, ApiError> {
    Ok(Json(win_probability_envelope(&state.db, &filter).await?))
}

/// GET /wp/all
pub async fn wp_all(State(state): State<AppState>) -> Result<WinProbabilityResponse, ApiError> {
    win_probability(&state, RecordFilter::default()).await
}

/// GET /wp/:quarter
pub async fn wp_by_quarter(
    State(state): State<AppState>,
    Path(quarter): Path<String>,
) -> Result<WinProbabilityResponse, ApiError> {
    win_probability(&state, RecordFilter::quarter(clean_quarter(&quarter))).await
}

/// GET /wp/ae/:nik
pub async fn wp_by_ae(
    State(state): State<AppState>,
    Path(nik): Path<String>,
) -> Result<WinProbabilityResponse, ApiError> {
    win_probability(&state, RecordFilter::nik(parse_nik(&nik)?)).await
}

/// GET /wp/ae/:nik/:quarter
pub async fn wp_by_ae_and_quarter(
    State(state): State<AppState>,
    Path((nik, quarter)): Path<(String, String)>,
) -> Result<WinProbabilityResponse, ApiError> {
    let filter = RecordFilter::nik(parse_nik(&nik)?).in_quarter(clean_quarter(&quarter));
    win_probability(&state, filter).await
}

/// GET /wp/project/:lop_id
pub async fn wp_by_project(
    State(state): State<AppState>,
    Path(lop_id): Path<String>,
) -> Result<WinProbabilityResponse, ApiError> {
    win_probability(&state, RecordFilter::lop_id(lop_id.trim())).await
}

/// GET /wp/project/:lop_id/:quarter
pub async fn wp_by_project_and_quarter(
    State(state): State<AppState>,
    Path((lop_id, quarter)): Path<(String, String)>,
) -> Result<WinProbabilityResponse, ApiError> {
    let filter = RecordFilter::lop_id(lop_id.trim()).in_quarter(clean_quarter(&quarter));
    win_probability(&state, filter).await
}

pub fn win_probability_routes() -> Router<AppState> {
    Router::new()
        .route("/all", get(wp_all))
        .route("/:quarter", get(wp_by_quarter))
        .route("/ae/:nik", get(wp_by_ae))
        .route("/ae/:nik/:quarter", get(wp_by_ae_and_quarter))
        .route("/project/:lop_id", get(wp_by_project))
        .route("/project/:lop_id/:quarter", get(wp_by_project_and_quarter))
}

/// Period parameters; validated by hand so a bad request still gets a JSON body
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub quarter: Option<String>,
    pub year: Option<String>,
}

impl PeriodQuery {
    fn period(&self) -> Result<(String, i64), ApiError> {
        let quarter = self
            .quarter
            .as_deref()
            .map(clean_quarter)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing query parameter: quarter".to_string()))?;
        let year = self
            .year
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Missing query parameter: year".to_string()))?;
        let year = year
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid year: {}", year)))?;
        Ok((quarter, year))
    }
}

/// GET /ep/:nik/predictions?quarter=Q&year=Y
pub async fn ep_for_ae(
    State(state): State<AppState>,
    Path(nik): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<EvaluationResponse, ApiError> {
    let nik = parse_nik(&nik)?;
    let (quarter, year) = query.period()?;
    Ok(Json(evaluation_prediction_detail(&state.db, nik, &quarter, year).await?))
}

/// GET /ep/predictions?quarter=Q&year=Y
pub async fn ep_for_period(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<EvaluationResponse, ApiError> {
    let (quarter, year) = query.period()?;
    Ok(Json(evaluation_predictions_for_period(&state.db, &quarter, year).await?))
}

pub fn evaluation_prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/predictions", get(ep_for_period))
        .route("/:nik/predictions", get(ep_for_ae))
}

/// GET /fi/:phase (overall ranking)
pub async fn fi_overall(
    State(state): State<AppState>,
    Path(phase): Path<String>,
) -> Result<FeatureImportanceResponse, ApiError> {
    Ok(Json(feature_importance_envelope(&state.db, phase.trim(), ALL_QUARTERS).await?))
}

/// GET /fi/:phase/:quarter
pub async fn fi_by_quarter(
    State(state): State<AppState>,
    Path((phase, quarter)): Path<(String, String)>,
) -> Result<FeatureImportanceResponse, ApiError> {
    let quarter = clean_quarter(&quarter);
    Ok(Json(feature_importance_envelope(&state.db, phase.trim(), &quarter).await?))
}

pub fn feature_importance_routes() -> Router<AppState> {
    Router::new()
        .route("/:phase", get(fi_overall))
        .route("/:phase/:quarter", get(fi_by_quarter))
}
