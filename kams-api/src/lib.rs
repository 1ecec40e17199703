//! kams-api library - read side of the KAMs Journey backend
//!
//! Serves the ingested HR sheets, predictions and feature importances over
//! HTTP. The store is only ever read here; `kams-load` writes it.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod db;
pub mod envelope;

use kams_common::db::{Development, Evaluation, Execution, Performance};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only in production)
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/orientasi", api::orientation_routes())
        .nest("/pelaksanaan", api::entity_routes::<Execution>())
        .nest("/kinerja", api::entity_routes::<Performance>())
        .nest("/evaluasi", api::entity_routes::<Evaluation>())
        .nest("/pengembangan", api::entity_routes::<Development>())
        .nest("/project", api::project_routes())
        .nest("/wp", api::win_probability_routes())
        .nest("/ep", api::evaluation_prediction_routes())
        .nest("/fi", api::feature_importance_routes())
        .merge(api::search_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
