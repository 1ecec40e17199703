//! Configuration loading and resolution
//!
//! Each setting is resolved independently, highest priority first:
//! 1. Command-line argument (clap also folds in the `KAMS_*` environment variables)
//! 2. TOML config file
//! 3. OS-dependent compiled default
//!
//! A missing config file is not an error: resolution carries on with
//! defaults and reports [`ConfigSource::Missing`] so the caller can warn once
//! logging is up. A config file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "KAMS_CONFIG";

/// Database file name inside the default data folder
pub const DATABASE_FILE_NAME: &str = "kams.db";

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Folder holding the pipeline's JSON artifacts
    pub data_dir: PathBuf,
    /// Interface the HTTP server binds to
    pub host: String,
    /// Port the HTTP server binds to
    pub port: u16,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl ServiceConfig {
    /// `host:port` string for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Values compiled into the binary, used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        // ~/.local/share/kams on Linux, ~/Library/Application Support/kams on macOS,
        // %LOCALAPPDATA%\kams on Windows
        let data_root = dirs::data_local_dir()
            .map(|d| d.join("kams"))
            .unwrap_or_else(|| PathBuf::from("./kams_data"));

        Self {
            database_path: data_root.join(DATABASE_FILE_NAME),
            data_dir: PathBuf::from("./data"),
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

/// On-disk TOML configuration. Every key is optional.
///
/// ```toml
/// database_path = "/var/lib/kams/kams.db"
/// data_dir = "/var/lib/kams/data"
/// host = "0.0.0.0"
/// port = 8000
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a config file; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Values supplied on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Where the file layer of a resolved configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Loaded(PathBuf),
    /// Path was looked up but nothing is there
    Missing(PathBuf),
    /// No config directory on this platform
    NoPath,
}

/// Merges overrides, config file and compiled defaults into a [`ServiceConfig`]
pub struct ConfigResolver {
    overrides: ConfigOverrides,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            defaults: CompiledDefaults::for_current_platform(),
        }
    }

    /// Replace the compiled defaults (tests pin them to known values)
    pub fn with_defaults(mut self, defaults: CompiledDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Config file location: explicit argument, then `KAMS_CONFIG`, then the
    /// per-user config directory
    pub fn config_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.overrides.config_file {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir().map(|d| d.join("kams").join("config.toml"))
    }

    pub fn resolve(self) -> Result<ServiceConfig> {
        self.resolve_with_source().map(|(config, _)| config)
    }

    /// Resolve, also reporting which config file (if any) contributed
    ///
    /// Nothing is logged here: resolution runs before a subscriber exists.
    pub fn resolve_with_source(self) -> Result<(ServiceConfig, ConfigSource)> {
        let (file, source) = match self.config_file_path() {
            Some(path) => match TomlConfig::load(&path)? {
                Some(config) => (config, ConfigSource::Loaded(path)),
                None => (TomlConfig::default(), ConfigSource::Missing(path)),
            },
            None => (TomlConfig::default(), ConfigSource::NoPath),
        };

        let ConfigOverrides {
            database_path,
            data_dir,
            host,
            port,
            log_level,
            ..
        } = self.overrides;
        let defaults = self.defaults;

        let config = ServiceConfig {
            database_path: database_path
                .or(file.database_path)
                .unwrap_or(defaults.database_path),
            data_dir: data_dir.or(file.data_dir).unwrap_or(defaults.data_dir),
            host: host.or(file.host).unwrap_or(defaults.host),
            port: port.or(file.port).unwrap_or(defaults.port),
            log_level: log_level.or(file.log_level).unwrap_or(defaults.log_level),
        };
        Ok((config, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_toml() {
        let config = TomlConfig::parse("port = 9100\nhost = \"0.0.0.0\"\n").unwrap();
        assert_eq!(config.port, Some(9100));
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let result = TomlConfig::parse("prot = 9100\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bind_address() {
        let defaults = CompiledDefaults::for_current_platform();
        let config = ServiceConfig {
            database_path: defaults.database_path,
            data_dir: defaults.data_dir,
            host: "127.0.0.1".to_string(),
            port: 8123,
            log_level: "info".to_string(),
        };
        assert_eq!(config.bind_address(), "127.0.0.1:8123");
    }

    #[test]
    fn test_default_database_file_name() {
        let defaults = CompiledDefaults::for_current_platform();
        assert!(defaults.database_path.ends_with(DATABASE_FILE_NAME));
        assert_eq!(defaults.port, 8000);
        assert_eq!(defaults.log_level, "info");
    }
}
