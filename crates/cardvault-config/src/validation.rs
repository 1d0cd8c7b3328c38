// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CardvaultConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &CardvaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log_level `{}` must be one of {}",
                config.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gpg.binary.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gpg.binary must not be empty".to_string(),
        });
    }

    if config.gpg.card_binary.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gpg.card_binary must not be empty".to_string(),
        });
    }

    if config.staging.dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "staging.dir must not be empty".to_string(),
        });
    }

    // The prefix is the only thing marking a file as ours for the startup
    // purge, so it must be non-empty and cannot smuggle in a path.
    let prefix = &config.staging.prefix;
    if prefix.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "staging.prefix must not be empty".to_string(),
        });
    } else if prefix.contains('/') || prefix.contains('\\') || prefix.starts_with('.') {
        errors.push(ConfigError::Validation {
            message: format!(
                "staging.prefix `{prefix}` must be a plain file name prefix (no separators, no leading dot)"
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
