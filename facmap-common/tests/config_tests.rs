//! Unit tests for config discovery and graceful degradation
//!
//! - A missing discovered config file is not fatal (defaults are used)
//! - An explicitly requested config file must exist
//! - Parse errors are reported with the file name
//!
//! Tests that change the working directory are marked #[serial].

use facmap_common::config::{
    load_or_default, load_toml_config, resolve_config_path, CachePersistence, TomlConfig,
    CONFIG_FILE_NAME,
};
use facmap_common::Error;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_explicit_path_wins() {
    let explicit = PathBuf::from("/nonexistent/custom.toml");
    assert_eq!(resolve_config_path(Some(&explicit)), Some(explicit));
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    let err = load_or_default(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("missing.toml"));
}

#[test]
fn test_explicit_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    std::fs::write(&path, "[cache]\npersistence = \"batched\"\n").unwrap();

    let (config, loaded_from) = load_or_default(Some(&path)).unwrap();

    assert_eq!(loaded_from, Some(path));
    assert_eq!(config.cache.persistence, Some(CachePersistence::Batched));
}

#[test]
fn test_parse_error_names_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[geocoder\nstrategy = ").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let result = toml::from_str::<TomlConfig>("[geocoder]\nstrategy = \"google\"\n");
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_local_config_file_is_discovered() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        "[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(temp_dir.path()).unwrap();

    let result = load_or_default(None);

    std::env::set_current_dir(previous).unwrap();

    let (config, loaded_from) = result.unwrap();
    assert_eq!(loaded_from, Some(PathBuf::from(CONFIG_FILE_NAME)));
    assert_eq!(config.logging.level, "debug");
}
