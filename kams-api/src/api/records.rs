//! Per-entity read endpoints
//!
//! Every HR sheet gets the same route set, built once generically over
//! [`Record`]. Plural lookups answer `[]` when nothing matches; singular
//! lookups answer 404.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use kams_common::db::{Orientation, Project};
use serde::Deserialize;

use super::error::{clean_quarter, parse_nik, ApiError};
use crate::db::{fetch_one_record, fetch_records, OrientationSummary, Record, RecordFilter};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AeQuery {
    pub quarter: Option<String>,
}

/// GET /{entity}/all
pub async fn list_all<R: Record>(State(state): State<AppState>) -> Result<Json<Vec<R>>, ApiError> {
    Ok(Json(fetch_records(&state.db, &RecordFilter::default()).await?))
}

/// GET /{entity}/:quarter
pub async fn list_by_quarter<R: Record>(
    State(state): State<AppState>,
    Path(quarter): Path<String>,
) -> Result<Json<Vec<R>>, ApiError> {
    let filter = RecordFilter::quarter(clean_quarter(&quarter));
    Ok(Json(fetch_records(&state.db, &filter).await?))
}

/// GET /{entity}/nik/:nik
pub async fn list_by_nik<R: Record>(
    State(state): State<AppState>,
    Path(nik): Path<String>,
) -> Result<Json<Vec<R>>, ApiError> {
    let filter = RecordFilter::nik(parse_nik(&nik)?);
    Ok(Json(fetch_records(&state.db, &filter).await?))
}

/// GET /{entity}/nik/:nik/quarter/:quarter
pub async fn get_by_nik_and_quarter<R: Record>(
    State(state): State<AppState>,
    Path((nik, quarter)): Path<(String, String)>,
) -> Result<Json<R>, ApiError> {
    let filter = RecordFilter::nik(parse_nik(&nik)?).in_quarter(clean_quarter(&quarter));
    Ok(Json(fetch_one_record(&state.db, &filter).await?))
}

/// GET /{entity}/ae/:nik?quarter=Q
///
/// One row when a quarter is given, every quarter's rows otherwise.
pub async fn get_for_ae<R: Record>(
    State(state): State<AppState>,
    Path(nik): Path<String>,
    Query(query): Query<AeQuery>,
) -> Result<Response, ApiError> {
    let nik = parse_nik(&nik)?;
    let quarter = query
        .quarter
        .as_deref()
        .map(clean_quarter)
        .filter(|q| !q.is_empty());

    match quarter {
        Some(quarter) => {
            let filter = RecordFilter::nik(nik).in_quarter(quarter);
            let row: R = fetch_one_record(&state.db, &filter).await?;
            Ok(Json(row).into_response())
        }
        None => {
            let rows: Vec<R> = fetch_records(&state.db, &RecordFilter::nik(nik)).await?;
            Ok(Json(rows).into_response())
        }
    }
}

/// Routes shared by every HR sheet
pub fn entity_routes<R: Record>() -> Router<AppState> {
    Router::new()
        .route("/all", get(list_all::<R>))
        .route("/:quarter", get(list_by_quarter::<R>))
        .route("/nik/:nik", get(list_by_nik::<R>))
        .route("/nik/:nik/quarter/:quarter", get(get_by_nik_and_quarter::<R>))
        .route("/ae/:nik", get(get_for_ae::<R>))
}

/// GET /orientasi/summary
pub async fn orientation_summary(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrientationSummary>>, ApiError> {
    let rows: Vec<Orientation> = fetch_records(&state.db, &RecordFilter::default()).await?;
    Ok(Json(rows.iter().map(OrientationSummary::from).collect()))
}

/// GET /orientasi/summary/:quarter
pub async fn orientation_summary_by_quarter(
    State(state): State<AppState>,
    Path(quarter): Path<String>,
) -> Result<Json<Vec<OrientationSummary>>, ApiError> {
    let filter = RecordFilter::quarter(clean_quarter(&quarter));
    let rows: Vec<Orientation> = fetch_records(&state.db, &filter).await?;
    Ok(Json(rows.iter().map(OrientationSummary::from).collect()))
}

/// Orientation: shared routes plus summaries
pub fn orientation_routes() -> Router<AppState> {
    entity_routes::<Orientation>()
        .route("/summary", get(orientation_summary))
        .route("/summary/:quarter", get(orientation_summary_by_quarter))
        .route("/quarter/:quarter", get(list_by_quarter::<Orientation>))
}

/// GET /project/lop/:lop_id
pub async fn list_by_lop_id(
    State(state): State<AppState>,
    Path(lop_id): Path<String>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let filter = RecordFilter::lop_id(lop_id.trim());
    Ok(Json(fetch_records(&state.db, &filter).await?))
}

/// GET /project/lop/:lop_id/quarter/:quarter
pub async fn get_by_lop_id_and_quarter(
    State(state): State<AppState>,
    Path((lop_id, quarter)): Path<(String, String)>,
) -> Result<Json<Project>, ApiError> {
    let filter = RecordFilter::lop_id(lop_id.trim()).in_quarter(clean_quarter(&quarter));
    Ok(Json(fetch_one_record(&state.db, &filter).await?))
}

/// Project: shared routes plus project-id lookups
pub fn project_routes() -> Router<AppState> {
    entity_routes::<Project>()
        .route("/lop/:lop_id", get(list_by_lop_id))
        .route("/lop/:lop_id/quarter/:quarter", get(get_by_lop_id_and_quarter))
}
