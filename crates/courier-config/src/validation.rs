// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as lease bounds and non-zero queue capacities.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Log levels accepted by `hub.log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.hub.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "hub.log_level `{}` must be one of {}",
            config.hub.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let delivery = &config.delivery;
    if delivery.default_lease_secs == 0 {
        errors.push(ConfigError::validation(
            "delivery.default_lease_secs must be at least 1",
        ));
    }
    if delivery.default_lease_secs > delivery.max_lease_secs {
        errors.push(ConfigError::validation(format!(
            "delivery.default_lease_secs ({}) exceeds delivery.max_lease_secs ({})",
            delivery.default_lease_secs, delivery.max_lease_secs
        )));
    }
    if delivery.max_claim_batch == 0 {
        errors.push(ConfigError::validation(
            "delivery.max_claim_batch must be at least 1",
        ));
    }
    if delivery.notification_queue_capacity == 0 {
        errors.push(ConfigError::validation(
            "delivery.notification_queue_capacity must be at least 1",
        ));
    }
    if delivery.default_ttl_secs == Some(0) {
        errors.push(ConfigError::validation(
            "delivery.default_ttl_secs must be at least 1 when set",
        ));
    }

    if config.sweeper.interval_secs == 0 {
        errors.push(ConfigError::validation(
            "sweeper.interval_secs must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CourierConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn lease_above_maximum_fails_validation() {
        let mut config = CourierConfig::default();
        config.delivery.default_lease_secs = 120;
        config.delivery.max_lease_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "exceeds delivery.max_lease_secs"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = CourierConfig::default();
        config.hub.log_level = "loud".to_string();
        config.delivery.max_claim_batch = 0;
        config.delivery.notification_queue_capacity = 0;
        config.sweeper.interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(has_message(&errors, "hub.log_level"));
        assert!(has_message(&errors, "sweeper.interval_secs"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = CourierConfig::default();
        config.delivery.default_ttl_secs = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "default_ttl_secs"));
    }
}
