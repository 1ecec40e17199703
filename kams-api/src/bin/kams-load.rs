//! kams-load - batch ingestion of the modelling pipeline's JSON artifacts
//!
//! Each job runs in its own transaction: it either commits every row it
//! built or none. Jobs append unless `--replace` is given.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use kams_api::cli::{resolve_and_init_tracing, CommonArgs};
use kams_common::db::init_database;
use kams_common::ingest::{
    import_all, import_evaluation_predictions_files, import_feature_importance_file,
    import_raw_sheets_file, import_win_probability_files, ImportMode, ImportSummary,
    FEATURE_IMPORTANCE_FILE, RAW_SHEETS_FILE, WP_META_FILE, WP_PREDICTIONS_FILE,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "kams-load", version, about = "Load KAMs Journey JSON artifacts into the store")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Delete rows of the same scope before inserting instead of appending
    #[arg(long, global = true)]
    replace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Feature importance per pipeline phase
    FeatureImportance {
        #[arg(default_value = FEATURE_IMPORTANCE_FILE)]
        file: PathBuf,
    },
    /// The six quarterly HR sheets
    RawSheets {
        #[arg(default_value = RAW_SHEETS_FILE)]
        file: PathBuf,
    },
    /// Win-probability predictions and their model meta
    WinProbability {
        #[arg(long, default_value = WP_PREDICTIONS_FILE)]
        predictions: PathBuf,
        #[arg(long, default_value = WP_META_FILE)]
        meta: PathBuf,
    },
    /// Evaluation predictions of one period
    EvaluationPrediction {
        #[arg(long)]
        meta: PathBuf,
        #[arg(long)]
        predictions: PathBuf,
    },
    /// Every artifact found in the data directory
    All {
        #[arg(long, env = "KAMS_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

fn report(result: kams_common::Result<ImportSummary>) -> Result<()> {
    match result {
        Ok(summary) => {
            println!("✓ {}", summary);
            Ok(())
        }
        Err(e) => {
            error!("Import failed and was rolled back: {}", e);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = cli.common.overrides();
    if let Command::All { data_dir } = &cli.command {
        overrides.data_dir = data_dir.clone();
    }
    let config = resolve_and_init_tracing(overrides)?;

    let mode = if cli.replace {
        ImportMode::Replace
    } else {
        ImportMode::Append
    };
    info!("Starting kams-load v{} ({} mode)", env!("CARGO_PKG_VERSION"), mode.as_str());

    let pool = init_database(&config.database_path).await?;

    match cli.command {
        Command::FeatureImportance { file } => {
            report(import_feature_importance_file(&pool, &file, mode).await)?;
        }
        Command::RawSheets { file } => {
            report(import_raw_sheets_file(&pool, &file, mode).await)?;
        }
        Command::WinProbability { predictions, meta } => {
            report(import_win_probability_files(&pool, &predictions, &meta, mode).await)?;
        }
        Command::EvaluationPrediction { meta, predictions } => {
            report(import_evaluation_predictions_files(&pool, &meta, &predictions, mode).await)?;
        }
        Command::All { .. } => {
            info!("Data directory: {}", config.data_dir.display());
            let outcomes = import_all(&pool, &config.data_dir, mode).await;

            let mut failed = 0usize;
            for (job, result) in outcomes {
                match result {
                    Ok(summary) => println!("✓ {}", summary),
                    Err(e) => {
                        println!("✗ {}: {}", job, e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{} import job(s) failed", failed);
            }
        }
    }

    pool.close().await;
    Ok(())
}
