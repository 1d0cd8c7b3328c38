// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cardvault.toml` > `~/.config/cardvault/cardvault.toml` >
//! `/etc/cardvault/cardvault.toml` with environment variable overrides via `CARDVAULT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CardvaultConfig;

/// Config sections addressable from the environment.
const SECTIONS: &[&str] = &["storage", "gpg", "staging", "token"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cardvault/cardvault.toml` (system-wide)
/// 3. `~/.config/cardvault/cardvault.toml` (user XDG config)
/// 4. `./cardvault.toml` (local directory)
/// 5. `CARDVAULT_*` environment variables
pub fn load_config() -> Result<CardvaultConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<CardvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CardvaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CardvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CardvaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Config files consulted by [`load_config`], lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/cardvault/cardvault.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("cardvault").join("cardvault.toml"));
    }
    paths.push(PathBuf::from("cardvault.toml"));
    paths
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(CardvaultConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Environment provider mapping `CARDVAULT_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// keys survive: `CARDVAULT_GPG_CARD_BINARY` is `gpg.card_binary`, not
/// `gpg.card.binary`. `CARDVAULT_SECRET` is read by the front end and
/// ignored here.
fn env_provider() -> Env {
    Env::prefixed("CARDVAULT_")
        .ignore(&["secret"])
        .map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
