//! Table Schema Definitions
//!
//! Single source of truth for every table. Column order here is the column
//! order of the created table; field names match the JSON keys produced by
//! the modelling pipeline.

use crate::db::models::*;
use crate::db::schema::{ColumnDefinition as Col, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

impl TableSchema for Orientation {
    fn table_name() -> &'static str {
        "orientasi"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::sheet(),
            Col::nik(),
            Col::text("name"),
            Col::real("solution"),
            Col::real("account_profile"),
            Col::real("account_plan"),
            Col::real("sales_funnel"),
            Col::real("bidding_management"),
            Col::real("project_management"),
            Col::text("saran_pengembangan"),
            Col::real("customer_introduction"),
            Col::real("visiting_customer"),
            Col::real("transfer_customer_knowledge"),
            Col::real("transfer_customer_documentation"),
            Col::real("customer_matching"),
            Col::text("periode"),
            Col::text("unit"),
        ]
    }
}

impl TableSchema for Execution {
    fn table_name() -> &'static str {
        "pelaksanaan"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::sheet(),
            Col::nik(),
            Col::text("name"),
            Col::real("account_profile_duty"),
            Col::real("account_plan_duty"),
            Col::real("customer_requirement"),
            Col::real("identifikasi_potensi_proyek"),
            Col::real("prebid_preparation"),
            Col::real("risk_project_assessment"),
            Col::real("proses_delivery"),
            Col::real("invoice_pelanggan"),
            Col::real("customer_key_person"),
            Col::text("periode"),
            Col::text("unit"),
        ]
    }
}

impl TableSchema for Performance {
    fn table_name() -> &'static str {
        "kinerja"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::sheet(),
            Col::nik(),
            Col::text("name"),
            Col::real("revenue"),
            Col::real("sales_datin"),
            Col::real("sales_wifi"),
            Col::real("sales_hsi"),
            Col::real("sales_wireline"),
            Col::real("profitability"),
            Col::real("collection_rate"),
            Col::real("ae_tools"),
            Col::real("nps"),
            Col::real("capability"),
            Col::real("behaviour"),
            Col::real("overall_score"),
            Col::integer("kuadran"),
            Col::text("periode"),
            Col::text("unit"),
        ]
    }
}

impl TableSchema for Evaluation {
    fn table_name() -> &'static str {
        "evaluasi_kinerja"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::sheet(),
            Col::nik(),
            Col::text("name"),
            Col::real("revenue_sales_achievement"),
            Col::real("sales_achievement_datin"),
            Col::real("sales_achievement_wifi"),
            Col::real("sales_achievement_hsi"),
            Col::real("sales_achievement_wireline"),
            Col::real("profitability_achievement"),
            Col::real("collection_rate_achievement"),
            Col::real("nps_achievement"),
            Col::real("ae_tools_achievement"),
            Col::real("capability_achievement"),
            Col::real("behaviour_achievement"),
            Col::real("overall_score"),
            Col::integer("kuadran"),
            Col::text("periode"),
            Col::text("unit"),
        ]
    }
}

impl TableSchema for Development {
    fn table_name() -> &'static str {
        "pengembangan"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::sheet(),
            Col::nik(),
            Col::text("name"),
            Col::real("coaching_result_informal"),
            Col::text("lesson_learned_informal"),
            Col::text("course_name"),
            Col::text("certificate_id"),
            Col::real("coaching_result_formal"),
            Col::text("lesson_learned_formal"),
            Col::text("periode"),
            Col::text("unit"),
        ]
    }
}

impl TableSchema for Project {
    fn table_name() -> &'static str {
        "project"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::sheet(),
            Col::nik(),
            Col::text("name"),
            Col::text("lop_id").indexed(),
            Col::text("project_name"),
            Col::text("customer_name"),
            Col::real("value_projects"),
            Col::text("stage"),
            Col::integer("jumlah_aktivitas"),
            Col::text("status"),
            Col::text("periode"),
            Col::text("unit"),
        ]
    }
}

impl TableSchema for WinProbabilityPrediction {
    fn table_name() -> &'static str {
        "wp_predictions"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::quarter(),
            Col::nik(),
            Col::text("name"),
            Col::text("unit"),
            Col::text("lop_id").indexed(),
            Col::text("project_name"),
            Col::text("customer_name"),
            Col::text("stage"),
            Col::text("status"),
            Col::real("value_projects"),
            Col::real("jumlah_aktivitas"),
            Col::real("win_probability"),
            Col::real("win_probability_pct"),
            Col::text("predicted_class"),
            Col::json("top_positive_factors"),
            Col::json("top_negative_factors"),
        ]
    }
}

impl TableSchema for WinProbabilityMeta {
    fn table_name() -> &'static str {
        "wp_meta"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::text("best_model_name"),
            Col::json("metrics"),
            Col::text("imported_at")
                .not_null()
                .default("CURRENT_TIMESTAMP")
                .loader_managed(),
        ]
    }
}

impl TableSchema for EvaluationPredictionMeta {
    fn table_name() -> &'static str {
        "ep_meta"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::text("prediction_quarter").not_null().indexed(),
            Col::integer("prediction_year").not_null(),
            Col::text("generated_date"),
            Col::text("best_regressor"),
            Col::text("best_classifier"),
            Col::json("model_metrics"),
        ]
    }
}

impl TableSchema for EvaluationPrediction {
    fn table_name() -> &'static str {
        "ep_predictions"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::nik(),
            Col::text("name"),
            Col::text("prediction_quarter").not_null().indexed(),
            Col::integer("prediction_year").not_null().indexed(),
            Col::integer("predicted_kuadran"),
            Col::real("prediction_confidence"),
            Col::json("predictions_json"),
            Col::json("raw_json"),
        ]
    }
}

impl TableSchema for FeatureImportanceMeta {
    fn table_name() -> &'static str {
        "fi_meta"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::text("phase").not_null().indexed(),
            Col::json("phase_config"),
            Col::text("best_regressor"),
            Col::json("metrics_overall"),
            Col::json("metrics_by_quarter"),
        ]
    }
}

impl TableSchema for FeatureImportance {
    fn table_name() -> &'static str {
        "fi_features"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::integer("meta_id")
                .not_null()
                .indexed()
                .references("fi_meta(id) ON DELETE CASCADE"),
            Col::text("phase").not_null().indexed(),
            Col::text("quarter").not_null(),
            Col::text("feature").not_null(),
            Col::real("importance").not_null(),
            Col::text("description"),
            Col::integer("rank"),
        ]
    }
}

impl TableSchema for CurrentMetaPointer {
    fn table_name() -> &'static str {
        "current_meta"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::text("kind").primary_key(),
            Col::integer("meta_id").not_null(),
            Col::text("updated_at").not_null().default("CURRENT_TIMESTAMP"),
        ]
    }
}

impl TableSchema for ImportRun {
    fn table_name() -> &'static str {
        "import_runs"
    }

    fn expected_columns() -> Vec<Col> {
        vec![
            Col::id(),
            Col::text("run_id").not_null(),
            Col::text("job").not_null(),
            Col::text("mode").not_null(),
            Col::integer("rows_inserted").not_null().default("0"),
            Col::text("started_at").not_null(),
            Col::text("finished_at").not_null(),
        ]
    }
}

/// Create (or bring up to date) every table
///
/// Parents are created before children so the `fi_features` foreign key
/// always resolves.
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    info!("Creating tables");

    SchemaSync::create_table::<Orientation>(pool).await?;
    SchemaSync::create_table::<Execution>(pool).await?;
    SchemaSync::create_table::<Performance>(pool).await?;
    SchemaSync::create_table::<Evaluation>(pool).await?;
    SchemaSync::create_table::<Development>(pool).await?;
    SchemaSync::create_table::<Project>(pool).await?;

    SchemaSync::create_table::<WinProbabilityMeta>(pool).await?;
    SchemaSync::create_table::<WinProbabilityPrediction>(pool).await?;
    SchemaSync::create_table::<EvaluationPredictionMeta>(pool).await?;
    SchemaSync::create_table::<EvaluationPrediction>(pool).await?;
    SchemaSync::create_table::<FeatureImportanceMeta>(pool).await?;
    SchemaSync::create_table::<FeatureImportance>(pool).await?;

    SchemaSync::create_table::<CurrentMetaPointer>(pool).await?;
    SchemaSync::create_table::<ImportRun>(pool).await?;

    Ok(())
}
