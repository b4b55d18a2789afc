// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Numis configuration system.

use numis_config::diagnostic::ConfigError;
use numis_config::model::NumisConfig;
use numis_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "numis-test"
log_level = "debug"

[storage]
database_path = "/tmp/numis.db"
wal_mode = false

[session]
duration_secs = 120
request_price = 499

[bus]
subscriber_buffer = 16

[archive]
max_attempts = 3
base_backoff_ms = 50
profile_lookup_timeout_ms = 100

[retry]
max_attempts = 4
base_backoff_ms = 5

[payment]
endpoint = "https://payments.internal/debit"
timeout_secs = 3

[gateway]
enabled = false
host = "0.0.0.0"
port = 8080
bearer_token = "secret"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "numis-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/numis.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.session.duration_secs, 120);
    assert_eq!(config.session.request_price, Some(499));
    assert_eq!(config.bus.subscriber_buffer, 16);
    assert_eq!(config.archive.max_attempts, 3);
    assert_eq!(config.archive.profile_lookup_timeout().as_millis(), 100);
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(
        config.payment.endpoint.as_deref(),
        Some("https://payments.internal/debit")
    );
    assert!(!config.gateway.enabled);
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("secret"));
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    let defaults = NumisConfig::default();
    assert_eq!(config.session.duration_secs, 300);
    assert_eq!(config.bus.subscriber_buffer, 256);
    assert_eq!(config.archive.max_attempts, 5);
    assert_eq!(config.retry.max_attempts, 3);
    assert!(config.payment.endpoint.is_none());
    assert_eq!(config.gateway.host, defaults.gateway.host);
}

#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = "[session]\nduraton_secs = 60\n";
    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key,
                suggestion,
                span,
                ..
            } => Some((key.clone(), suggestion.clone(), *span)),
            _ => None,
        })
        .expect("should produce an UnknownKey diagnostic");
    assert_eq!(unknown.0, "session.duraton_secs");
    assert_eq!(unknown.1.as_deref(), Some("duration_secs"));
    assert!(unknown.2.is_some());
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[sesion]\nduration_secs = 1\n")
        .expect_err("unknown section should be rejected");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion: Some(s), .. } if key == "sesion" && s == "session"
    )));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n")
        .expect_err("string port should be rejected");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))));
}

#[test]
fn semantic_errors_surface_after_parse() {
    let errors = load_and_validate_str("[session]\nduration_secs = 0\n")
        .expect_err("zero duration should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("duration_secs"))));
}

#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numis.toml");
    std::fs::write(&path, "[session]\nduration_secs = 42\n").unwrap();
    let config = load_and_validate_path(&path).expect("file config should load");
    assert_eq!(config.session.duration_secs, 42);
}

#[test]
fn config_serializes_to_json() {
    let config = NumisConfig::default();
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["session"]["duration_secs"], 300);
    assert_eq!(json["gateway"]["enabled"], true);
}
