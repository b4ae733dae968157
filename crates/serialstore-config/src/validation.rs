// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths and names and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::{LOG_LEVELS, SerialStoreConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SerialStoreConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.store.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.database_path must not be empty".to_string(),
        });
    }

    let worker_name = &config.coordinator.worker_name;
    if worker_name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "coordinator.worker_name must not be empty".to_string(),
        });
    } else if worker_name.contains('\0') {
        // Thread names cannot carry interior NULs.
        errors.push(ConfigError::Validation {
            message: "coordinator.worker_name must not contain NUL bytes".to_string(),
        });
    }

    let level = config.logging.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.log_level `{}` is not one of: {}",
                config.logging.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
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

    fn messages(config: &SerialStoreConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SerialStoreConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SerialStoreConfig::default();
        config.store.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn empty_worker_name_fails_validation() {
        let mut config = SerialStoreConfig::default();
        config.coordinator.worker_name = String::new();
        assert!(messages(&config).iter().any(|m| m.contains("worker_name")));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = SerialStoreConfig::default();
        config.logging.log_level = "verbose".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("verbose")));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = SerialStoreConfig::default();
        config.logging.log_level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = SerialStoreConfig::default();
        config.store.database_path = String::new();
        config.coordinator.worker_name = String::new();
        config.logging.log_level = "loud".to_string();
        assert_eq!(validate_config(&config).unwrap_err().len(), 3);
    }
}
