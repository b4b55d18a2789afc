// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::NumisConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing on the first.
pub fn validate_config(config: &NumisConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.session.duration_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.duration_secs must be greater than zero".to_string(),
        });
    }

    if let Some(price) = config.session.request_price {
        if price < 0 {
            errors.push(ConfigError::Validation {
                message: format!("session.request_price must be non-negative, got {price}"),
            });
        }
    }

    if config.bus.subscriber_buffer == 0 {
        errors.push(ConfigError::Validation {
            message: "bus.subscriber_buffer must be at least 1".to_string(),
        });
    }

    if config.archive.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "archive.max_attempts must be at least 1".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "retry.max_attempts must be at least 1".to_string(),
        });
    }

    if let Some(endpoint) = &config.payment.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            errors.push(ConfigError::Validation {
                message: format!("payment.endpoint `{endpoint}` must be an http(s) URL"),
            });
        }
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if let Some(token) = &config.gateway.bearer_token {
        if token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "gateway.bearer_token must not be blank when set".to_string(),
            });
        }
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
        let config = NumisConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = NumisConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn zero_duration_fails_validation() {
        let mut config = NumisConfig::default();
        config.session.duration_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duration_secs"));
    }

    #[test]
    fn all_violations_are_collected() {
        let mut config = NumisConfig::default();
        config.bus.subscriber_buffer = 0;
        config.archive.max_attempts = 0;
        config.retry.max_attempts = 0;
        config.gateway.host = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(has_message(&errors, "subscriber_buffer"));
        assert!(has_message(&errors, "gateway.host"));
    }

    #[test]
    fn payment_endpoint_must_be_http() {
        let mut config = NumisConfig::default();
        config.payment.endpoint = Some("ftp://pay".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "payment.endpoint"));

        config.payment.endpoint = Some("https://pay.example.com/debit".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn negative_price_fails_validation() {
        let mut config = NumisConfig::default();
        config.session.request_price = Some(-1);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "request_price"));
    }
}
