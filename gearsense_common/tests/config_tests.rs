//! Config loader contract tests.
//!
//! Exercises `ConfigLoader::load` against real files: missing file,
//! malformed TOML, defaulted fields, and shared-section validation.

use gearsense_common::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct TestConfig {
    shared: SharedConfig,
    #[serde(default = "default_tick")]
    tick_interval_ms: u64,
}

fn default_tick() -> u64 {
    50
}

impl ConfigLoader for TestConfig {}

#[test]
fn missing_file_is_file_not_found() {
    let dir = TempDir::new().unwrap();
    let result = TestConfig::load(&dir.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn malformed_toml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[shared\nservice_name = ").unwrap();
    assert!(matches!(
        TestConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn loads_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ok.toml");
    fs::write(
        &path,
        r#"
[shared]
service_name = "ivi-bench"
"#,
    )
    .unwrap();

    let cfg = TestConfig::load(&path).unwrap();
    assert_eq!(cfg.shared.service_name, "ivi-bench");
    assert_eq!(cfg.shared.log_level, LogLevel::Info);
    assert_eq!(cfg.tick_interval_ms, 50);
    assert!(cfg.shared.validate().is_ok());
}

#[test]
fn explicit_fields_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lvl.toml");
    fs::write(
        &path,
        r#"
tick_interval_ms = 20

[shared]
log_level = "debug"
service_name = "ivi-bench"
"#,
    )
    .unwrap();

    let cfg = TestConfig::load(&path).unwrap();
    assert_eq!(cfg.shared.log_level, LogLevel::Debug);
    assert_eq!(cfg.tick_interval_ms, 20);
}

#[test]
fn invalid_log_level_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("badlvl.toml");
    fs::write(
        &path,
        r#"
[shared]
log_level = "loud"
service_name = "ivi-bench"
"#,
    )
    .unwrap();

    assert!(matches!(
        TestConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}
