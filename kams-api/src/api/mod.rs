//! HTTP API handlers for kams-api

pub mod error;
pub mod health;
pub mod predictions;
pub mod records;
pub mod search;

pub use error::ApiError;
pub use health::health_routes;
pub use predictions::{evaluation_prediction_routes, feature_importance_routes, win_probability_routes};
pub use records::{entity_routes, orientation_routes, project_routes};
pub use search::search_routes;
