//! kams-api - HTTP read API for the KAMs Journey analytics store
//!
//! Serves the HR sheets, win-probability and evaluation predictions and
//! feature importances loaded by `kams-load`.

use anyhow::Result;
use clap::Parser;
use kams_api::cli::{resolve_and_init_tracing, CommonArgs};
use kams_api::{build_router, db, AppState};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "kams-api", version, about = "KAMs Journey read API")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Interface to bind
    #[arg(long, env = "KAMS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "KAMS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = cli.common.overrides();
    overrides.host = cli.host;
    overrides.port = cli.port;
    let config = resolve_and_init_tracing(overrides)?;

    info!("Starting KAMs Journey API (kams-api) v{}", env!("CARGO_PKG_VERSION"));

    let pool = match db::connect_readonly(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let app = build_router(AppState::new(pool));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("kams-api listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
