/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;
use tutorlink::app_config::{Config, LogLevel};

use crate::common;

/// Test that a missing config file is created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path).expect("Failed to create config");

    assert!(path.exists());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.database.enable_wal);

    let written = std::fs::read_to_string(&path).unwrap();
    let reparsed: Config = serde_json::from_str(&written).unwrap();
    assert_eq!(reparsed.database.busy_timeout_ms, config.database.busy_timeout_ms);
}

/// Test that partial files fall back to defaults for missing keys
#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "database": { "path": "market.db" }, "seed": { "languages": ["fr", "Korean"] }, "log_level": "debug" }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).expect("Failed to load config");

    assert_eq!(config.database.path, Some(PathBuf::from("market.db")));
    assert!(config.database.enable_wal);
    assert_eq!(config.database.busy_timeout_ms, 5000);
    assert_eq!(config.seed.languages, vec!["fr", "Korean"]);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

/// Test that malformed JSON is reported with the file name
#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load_or_create(&path).unwrap_err();

    assert!(err.to_string().contains("broken.json"));
}

/// Test configuration validation
#[test]
fn test_validate_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.database.path = Some(PathBuf::new());
    assert!(config.validate().is_err());
    config.database.path = Some(PathBuf::from(":memory:"));
    assert!(config.validate().is_ok());

    config.database.busy_timeout_ms = 0;
    assert!(config.validate().is_err());
    config.database.busy_timeout_ms = 100;

    config.seed.languages = vec![String::new()];
    assert!(config.validate().is_err());
}

/// Test that save and load round-trip every field
#[test]
fn test_save_thenLoad_shouldPreserveValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.database.enable_wal = false;
    config.log_level = LogLevel::Trace;
    config.seed.languages = vec!["de".to_string()];
    config.save(&path).unwrap();

    let loaded = Config::load_or_create(&path).unwrap();
    assert!(!loaded.database.enable_wal);
    assert_eq!(loaded.log_level, LogLevel::Trace);
    assert_eq!(loaded.seed.languages, vec!["de"]);
}
