//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use medcode_domain::{Environment, MedCodeError};
use medcode_infra::config;
use tempfile::{Builder, NamedTempFile};

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_json_file() {
    let file = config_file(
        ".json",
        r#"{
            "encoder": {
                "client_id": "encoder-client",
                "client_secret": "encoder-secret",
                "environment": "production"
            },
            "lms": { "base_url": "https://lms.example.edu", "application_key": "app-key" },
            "validator": { "enabled": true, "api_key": "validator-key" }
        }"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    assert_eq!(config.encoder.client_id, "encoder-client");
    assert_eq!(config.encoder.client_secret, "encoder-secret");
    assert_eq!(config.encoder.environment, Environment::Production);
    assert_eq!(config.encoder.active_base_url(), config.encoder.base_url);
    assert_eq!(config.lms.api_base_url(), "https://lms.example.edu/learn/api/public/v1");
    assert_eq!(config.lms.application_key.as_deref(), Some("app-key"));
    assert!(config.validator.enabled);

    // Untouched sections keep their defaults
    assert_eq!(config.exchange.timeout_ms, 30_000);
    assert_eq!(config.ehr.epic.timeout_ms, 25_000);
}

#[test]
fn test_load_config_from_toml_file() {
    let file = config_file(
        ".toml",
        r#"
            [exchange]
            client_id = "exchange-client"
            environment = "sandbox"
            timeout_ms = 10000

            [ehr.oracle]
            endpoint = "https://oracle.sandbox.test"
            api_key = "oracle-key"
            timeout_ms = 5000
        "#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert_eq!(config.exchange.client_id, "exchange-client");
    assert_eq!(config.exchange.active_base_url(), config.exchange.sandbox_url);
    assert_eq!(config.exchange.timeout_ms, 10_000);
    assert_eq!(config.ehr.oracle.endpoint, "https://oracle.sandbox.test");
    assert_eq!(config.ehr.oracle.api_key.as_deref(), Some("oracle-key"));
    assert_eq!(config.ehr.meditech.timeout_ms, 30_000);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("medcode.json");

    let err = config::load_from_file(Some(missing)).expect_err("missing file");
    assert!(matches!(err, MedCodeError::Config(message) if message.contains("not found")));
}

#[test]
fn test_malformed_json_is_rejected() {
    let file = config_file(".json", r#"{ "encoder": { "timeout_ms": "fast" } }"#);

    let err = config::load_from_file(Some(file.path().to_path_buf())).expect_err("invalid");
    assert!(matches!(err, MedCodeError::Config(message) if message.contains("Invalid JSON")));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let file = config_file(".yaml", "encoder: {}");

    let err = config::load_from_file(Some(file.path().to_path_buf())).expect_err("yaml");
    assert!(matches!(err, MedCodeError::Config(message) if message.contains("yaml")));
}
