//! Global search endpoint

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use crate::db::{search, SearchResults};
use crate::AppState;

/// Query parameters for global search; both optional
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Employee id (all digits) or part of a name
    pub query: Option<String>,
    pub quarter: Option<String>,
}

/// GET /search?query=&quarter=
pub async fn global_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    let results = search(&state.db, params.query.as_deref(), params.quarter.as_deref()).await?;
    debug!("Search {:?}: {} matches", params, results.total());
    Ok(Json(results))
}

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/search", get(global_search))
}
