//! Database models
//!
//! One struct per table. Every HR-process row carries `quarter` and `sheet`
//! (stamped at ingestion) plus the employee identity (`nik`, `name`, `unit`).
//! Score columns are nullable: the source sheets leave cells blank.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

/// Orientation sheet: onboarding sub-scores for a new account executive
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Orientation {
    pub id: i64,
    pub quarter: String,
    pub sheet: Option<String>,
    pub nik: Option<i64>,
    pub name: Option<String>,

    // Basic understanding group
    pub solution: Option<f64>,
    pub account_profile: Option<f64>,
    pub account_plan: Option<f64>,
    pub sales_funnel: Option<f64>,
    pub bidding_management: Option<f64>,
    pub project_management: Option<f64>,

    pub saran_pengembangan: Option<String>,

    // Twinning group
    pub customer_introduction: Option<f64>,
    pub visiting_customer: Option<f64>,
    pub transfer_customer_knowledge: Option<f64>,
    pub transfer_customer_documentation: Option<f64>,

    pub customer_matching: Option<f64>,

    pub periode: Option<String>,
    pub unit: Option<String>,
}

/// Execution (pelaksanaan) sheet: duty and delivery indicators
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Execution {
    pub id: i64,
    pub quarter: String,
    pub sheet: Option<String>,
    pub nik: Option<i64>,
    pub name: Option<String>,

    pub account_profile_duty: Option<f64>,
    pub account_plan_duty: Option<f64>,
    pub customer_requirement: Option<f64>,
    pub identifikasi_potensi_proyek: Option<f64>,

    pub prebid_preparation: Option<f64>,
    pub risk_project_assessment: Option<f64>,
    pub proses_delivery: Option<f64>,

    pub invoice_pelanggan: Option<f64>,
    pub customer_key_person: Option<f64>,

    pub periode: Option<String>,
    pub unit: Option<String>,
}

/// Performance (kinerja) sheet: weighted achievement ratios
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Performance {
    pub id: i64,
    pub quarter: String,
    pub sheet: Option<String>,
    pub nik: Option<i64>,
    pub name: Option<String>,

    pub revenue: Option<f64>,
    pub sales_datin: Option<f64>,
    pub sales_wifi: Option<f64>,
    pub sales_hsi: Option<f64>,
    pub sales_wireline: Option<f64>,
    pub profitability: Option<f64>,
    pub collection_rate: Option<f64>,
    pub ae_tools: Option<f64>,
    pub nps: Option<f64>,
    pub capability: Option<f64>,
    pub behaviour: Option<f64>,

    pub overall_score: Option<f64>,
    pub kuadran: Option<i64>,

    pub periode: Option<String>,
    pub unit: Option<String>,
}

/// Evaluation (evaluasi kinerja) sheet: actual achievements compared against predictions
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub quarter: String,
    pub sheet: Option<String>,
    pub nik: Option<i64>,
    pub name: Option<String>,

    pub revenue_sales_achievement: Option<f64>,
    pub sales_achievement_datin: Option<f64>,
    pub sales_achievement_wifi: Option<f64>,
    pub sales_achievement_hsi: Option<f64>,
    pub sales_achievement_wireline: Option<f64>,
    pub profitability_achievement: Option<f64>,
    pub collection_rate_achievement: Option<f64>,
    pub nps_achievement: Option<f64>,
    pub ae_tools_achievement: Option<f64>,
    pub capability_achievement: Option<f64>,
    pub behaviour_achievement: Option<f64>,

    pub overall_score: Option<f64>,
    pub kuadran: Option<i64>,

    pub periode: Option<String>,
    pub unit: Option<String>,
}

/// Development (pengembangan) sheet: coaching results and training references
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Development {
    pub id: i64,
    pub quarter: String,
    pub sheet: Option<String>,
    pub nik: Option<i64>,
    pub name: Option<String>,

    pub coaching_result_informal: Option<f64>,
    pub lesson_learned_informal: Option<String>,

    pub course_name: Option<String>,
    pub certificate_id: Option<String>,

    pub coaching_result_formal: Option<f64>,
    pub lesson_learned_formal: Option<String>,

    pub periode: Option<String>,
    pub unit: Option<String>,
}

/// Project sheet: one sales opportunity handled by an account executive
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub quarter: String,
    pub sheet: Option<String>,
    pub nik: Option<i64>,
    pub name: Option<String>,

    pub lop_id: Option<String>,
    pub project_name: Option<String>,
    pub customer_name: Option<String>,

    pub value_projects: Option<f64>,
    pub stage: Option<String>,
    pub jumlah_aktivitas: Option<i64>,
    pub status: Option<String>,

    pub periode: Option<String>,
    pub unit: Option<String>,
}

/// Win-probability prediction for one project in one quarter
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WinProbabilityPrediction {
    pub id: i64,
    pub quarter: String,

    pub nik: Option<i64>,
    pub name: Option<String>,
    pub unit: Option<String>,

    pub lop_id: Option<String>,
    pub project_name: Option<String>,
    pub customer_name: Option<String>,
    pub stage: Option<String>,
    pub status: Option<String>,

    pub value_projects: Option<f64>,
    pub jumlah_aktivitas: Option<f64>,

    pub win_probability: Option<f64>,
    pub win_probability_pct: Option<f64>,
    pub predicted_class: Option<String>,
    pub top_positive_factors: Option<Json<Value>>,
    pub top_negative_factors: Option<Json<Value>>,
}

/// Snapshot of one win-probability modelling run
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WinProbabilityMeta {
    pub id: i64,
    pub best_model_name: Option<String>,
    /// Per-model metrics keyed by model name
    pub metrics: Option<Json<Value>>,
    pub imported_at: String,
}

/// Modelling run behind the evaluation predictions of one (quarter, year)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationPredictionMeta {
    pub id: i64,
    pub prediction_quarter: String,
    pub prediction_year: i64,
    pub generated_date: Option<String>,
    pub best_regressor: Option<String>,
    pub best_classifier: Option<String>,
    pub model_metrics: Option<Json<Value>>,
}

/// Predicted quadrant and per-category regression results for one employee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationPrediction {
    pub id: i64,
    pub nik: Option<i64>,
    pub name: Option<String>,
    pub prediction_quarter: String,
    pub prediction_year: i64,
    pub predicted_kuadran: Option<i64>,
    pub prediction_confidence: Option<f64>,
    pub predictions_json: Option<Json<Value>>,
    /// Whole input record, kept verbatim
    pub raw_json: Option<Json<Value>>,
}

/// Feature-importance run for one pipeline phase
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeatureImportanceMeta {
    pub id: i64,
    pub phase: String,
    pub phase_config: Option<Json<Value>>,
    pub best_regressor: Option<String>,
    pub metrics_overall: Option<Json<Value>>,
    pub metrics_by_quarter: Option<Json<Value>>,
}

/// Quarter tag of the aggregate (all-quarters) feature ranking
pub const ALL_QUARTERS: &str = "ALL";

/// One feature weight of a phase, either aggregate (`quarter = "ALL"`) or per quarter
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeatureImportance {
    pub id: i64,
    pub meta_id: i64,
    pub phase: String,
    pub quarter: String,
    pub feature: String,
    pub importance: f64,
    pub description: Option<String>,
    pub rank: Option<i64>,
}

/// Explicit "current meta" pointer for append-only meta tables
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurrentMetaPointer {
    /// `win_probability` or `feature_importance:<phase>`
    pub kind: String,
    pub meta_id: i64,
    pub updated_at: String,
}

/// Audit record of one ingestion job
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportRun {
    pub id: i64,
    pub run_id: String,
    pub job: String,
    pub mode: String,
    pub rows_inserted: i64,
    pub started_at: String,
    pub finished_at: String,
}
