//! Startup plumbing shared by both binaries

use clap::Args;
use kams_common::config::{ConfigOverrides, ConfigResolver, ConfigSource, ServiceConfig};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Options accepted by every binary
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Config file (TOML)
    #[arg(long, global = true, env = "KAMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "KAMS_DATABASE")]
    pub database: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "KAMS_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl CommonArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            database_path: self.database.clone(),
            log_level: self.log_level.clone(),
            ..Default::default()
        }
    }
}

/// Resolve configuration, then install the tracing subscriber it asks for
///
/// Resolution runs before any subscriber exists, so the config file outcome
/// is logged afterwards.
pub fn resolve_and_init_tracing(overrides: ConfigOverrides) -> kams_common::Result<ServiceConfig> {
    let (config, source) = ConfigResolver::new(overrides).resolve_with_source()?;

    init_tracing(&config.log_level);

    match source {
        ConfigSource::Loaded(path) => info!("Config file: {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file not found: {} (using defaults)", path.display())
        }
        ConfigSource::NoPath => {}
    }
    info!("Database path: {}", config.database_path.display());

    Ok(config)
}

/// `RUST_LOG` wins over the configured level
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
