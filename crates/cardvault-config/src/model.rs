// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the cardvault credential vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use cardvault_core::StagingMode;
use serde::{Deserialize, Serialize};

/// Top-level cardvault configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CardvaultConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// External gpg provider settings.
    #[serde(default)]
    pub gpg: GpgConfig,

    /// Where and how ciphertext is staged for decryption.
    #[serde(default)]
    pub staging: StagingConfig,

    /// Hardware token checks run by the front end.
    #[serde(default)]
    pub token: TokenConfig,
}

impl Default for CardvaultConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            gpg: GpgConfig::default(),
            staging: StagingConfig::default(),
            token: TokenConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cardvault").join("cardvault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cardvault.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// gpg provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GpgConfig {
    /// gpg executable, resolved through `PATH` unless absolute.
    #[serde(default = "default_gpg_binary")]
    pub binary: String,

    /// Smart card tool used for token verification.
    #[serde(default = "default_card_binary")]
    pub card_binary: String,

    /// Alternate gpg home directory (`--homedir`). `None` uses gpg's default.
    #[serde(default)]
    pub homedir: Option<String>,
}

impl Default for GpgConfig {
    fn default() -> Self {
        Self {
            binary: default_gpg_binary(),
            card_binary: default_card_binary(),
            homedir: None,
        }
    }
}

fn default_gpg_binary() -> String {
    "gpg".to_string()
}

fn default_card_binary() -> String {
    "gpg-card".to_string()
}

/// Staging configuration for retrieval sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// Directory holding session-unique staging files.
    #[serde(default = "default_staging_dir")]
    pub dir: String,

    /// File name prefix; startup purges every file carrying it.
    #[serde(default = "default_staging_prefix")]
    pub prefix: String,

    /// `file` stages ciphertext on disk, `pipe` streams it to the provider.
    #[serde(default)]
    pub mode: StagingMode,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
            prefix: default_staging_prefix(),
            mode: StagingMode::default(),
        }
    }
}

/// Per-user, so a startup purge never reaches another user's artifacts.
fn default_staging_dir() -> String {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("cardvault").join("staging"))
        .unwrap_or_else(|| std::env::temp_dir().join("cardvault-staging"))
        .display()
        .to_string()
}

fn default_staging_prefix() -> String {
    "cardvault-".to_string()
}

/// Hardware token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Run `gpg-card verify` before the vault is opened.
    #[serde(default = "default_verify_on_startup")]
    pub verify_on_startup: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            verify_on_startup: default_verify_on_startup(),
        }
    }
}

fn default_verify_on_startup() -> bool {
    true
}
