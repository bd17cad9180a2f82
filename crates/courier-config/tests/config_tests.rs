// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Courier configuration system.

use courier_config::diagnostic::ConfigError;
use courier_config::model::CourierConfig;
use courier_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_courier_config() {
    let toml = r#"
[hub]
name = "edge-hub"
log_level = "debug"

[storage]
database_path = "/tmp/courier-test.db"
wal_mode = false
busy_timeout_ms = 250

[delivery]
default_lease_secs = 30
max_lease_secs = 600
max_claim_batch = 25
notification_queue_capacity = 8
default_ttl_secs = 86400

[sweeper]
enabled = false
interval_secs = 10
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.hub.name, "edge-hub");
    assert_eq!(config.hub.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/courier-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.delivery.default_lease_secs, 30);
    assert_eq!(config.delivery.max_lease_secs, 600);
    assert_eq!(config.delivery.max_claim_batch, 25);
    assert_eq!(config.delivery.notification_queue_capacity, 8);
    assert_eq!(config.delivery.default_ttl_secs, Some(86400));
    assert!(!config.sweeper.enabled);
    assert_eq!(config.sweeper.interval_secs, 10);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.hub.name, "courier");
    assert_eq!(config.hub.log_level, "info");
    assert!(config.storage.database_path.ends_with("courier.db"));
    assert!(config.storage.wal_mode);
    assert_eq!(config.delivery.default_lease_secs, 60);
    assert!(config.sweeper.enabled);
    assert_eq!(config.sweeper.interval_secs, 60);
}

/// Dot-notation overrides (what the env provider produces) land in the right section.
#[test]
fn dotted_override_sets_delivery_key() {
    use figment::{providers::Serialized, Figment};

    let config: CourierConfig = Figment::new()
        .merge(Serialized::defaults(CourierConfig::default()))
        .merge(("delivery.max_claim_batch", 7))
        .extract()
        .expect("should set max_claim_batch via dot notation");

    assert_eq!(config.delivery.max_claim_batch, 7);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    let config = courier_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/path/courier.toml",
    ))
    .expect("missing file should be silently skipped");
    assert_eq!(config.hub.name, "courier");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[knowledge]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("knowledge"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Error output from load_and_validate_str names the unknown key, a suggestion,
/// and the accepted keys of the section.
#[test]
fn diagnostic_unknown_key_suggests_correction() {
    let toml = r#"
[delivery]
default_lease_sec = 30
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "default_lease_sec"
                && suggestion.as_deref() == Some("default_lease_secs")
                && valid_keys.contains("max_claim_batch")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Invalid type (string where number expected) produces an InvalidType diagnostic.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[sweeper]
interval_secs = "often"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("interval_secs"))),
        "expected InvalidType for sweeper.interval_secs, got: {errors:?}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "intervl_secs".to_string(),
        suggestion: Some("interval_secs".to_string()),
        valid_keys: "enabled, interval_secs".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `interval_secs`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("intervl_secs"));
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_catches_zero_claim_batch() {
    let toml = r#"
[delivery]
max_claim_batch = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero batch should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("max_claim_batch"))
    }));
}

#[test]
fn load_and_validate_valid_toml() {
    let config = load_and_validate_str("[hub]\nname = \"test\"\n").expect("should validate");
    assert_eq!(config.hub.name, "test");
}
