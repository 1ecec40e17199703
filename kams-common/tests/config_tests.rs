//! Configuration resolution
//!
//! Priority per field: override (command line / env fallback) > TOML file >
//! compiled defaults. A missing config file degrades to defaults.
//!
//! Tests touching KAMS_CONFIG are marked #[serial] so they never race.

use kams_common::config::{
    CompiledDefaults, ConfigOverrides, ConfigResolver, ConfigSource, TomlConfig, CONFIG_ENV_VAR,
};
use kams_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn pinned_defaults() -> CompiledDefaults {
    CompiledDefaults {
        database_path: PathBuf::from("/defaults/kams.db"),
        data_dir: PathBuf::from("/defaults/data"),
        host: "127.0.0.1".to_string(),
        port: 8000,
        log_level: "info".to_string(),
    }
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(defaults.database_path.ends_with("kams.db"));
    assert_eq!(defaults.data_dir, PathBuf::from("./data"));
    assert_eq!(defaults.host, "127.0.0.1");
    assert_eq!(defaults.port, 8000);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();

    let config = ConfigResolver::new(ConfigOverrides {
        config_file: Some(dir.path().join("absent.toml")),
        ..Default::default()
    })
    .with_defaults(pinned_defaults())
    .resolve()
    .unwrap();

    assert_eq!(config.database_path, PathBuf::from("/defaults/kams.db"));
    assert_eq!(config.bind_address(), "127.0.0.1:8000");
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = 9100\nlog_level = \"debug\"\n");

    let config = ConfigResolver::new(ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .with_defaults(pinned_defaults())
    .resolve()
    .unwrap();

    assert_eq!(config.port, 9100);
    assert_eq!(config.log_level, "debug");
    // Keys absent from the file keep their defaults
    assert_eq!(config.host, "127.0.0.1");
}

#[test]
#[serial]
fn test_overrides_win_over_file() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "host = \"0.0.0.0\"\nport = 9100\n");

    let config = ConfigResolver::new(ConfigOverrides {
        config_file: Some(path),
        port: Some(7000),
        database_path: Some(PathBuf::from("/cli/kams.db")),
        ..Default::default()
    })
    .with_defaults(pinned_defaults())
    .resolve()
    .unwrap();

    assert_eq!(config.port, 7000);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.database_path, PathBuf::from("/cli/kams.db"));
}

#[test]
#[serial]
fn test_config_file_from_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "data_dir = \"/env/data\"\n");
    env::set_var(CONFIG_ENV_VAR, &path);

    let resolver = ConfigResolver::new(ConfigOverrides::default()).with_defaults(pinned_defaults());
    assert_eq!(resolver.config_file_path(), Some(path));
    let config = resolver.resolve().unwrap();

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(config.data_dir, PathBuf::from("/env/data"));
}

#[test]
#[serial]
fn test_explicit_config_file_beats_environment() {
    env::set_var(CONFIG_ENV_VAR, "/somewhere/else.toml");
    let explicit = PathBuf::from("/explicit/config.toml");

    let resolver = ConfigResolver::new(ConfigOverrides {
        config_file: Some(explicit.clone()),
        ..Default::default()
    });
    let chosen = resolver.config_file_path();

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(chosen, Some(explicit));
}

#[test]
#[serial]
fn test_unparseable_config_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = \"not a number\"\n");

    let result = ConfigResolver::new(ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .resolve();

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_toml_load_missing_is_none() {
    let dir = TempDir::new().unwrap();
    assert_eq!(TomlConfig::load(&dir.path().join("none.toml")).unwrap(), None);
}

#[test]
#[serial]
fn test_resolution_reports_config_source() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.toml");

    let (_, source) = ConfigResolver::new(ConfigOverrides {
        config_file: Some(absent.clone()),
        ..Default::default()
    })
    .with_defaults(pinned_defaults())
    .resolve_with_source()
    .unwrap();
    assert_eq!(source, ConfigSource::Missing(absent));

    let path = write_config(&dir, "port = 9100\n");
    let (config, source) = ConfigResolver::new(ConfigOverrides {
        config_file: Some(path.clone()),
        ..Default::default()
    })
    .with_defaults(pinned_defaults())
    .resolve_with_source()
    .unwrap();
    assert_eq!(source, ConfigSource::Loaded(path));
    assert_eq!(config.port, 9100);
}
