// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-directory test environment.
//!
//! `TestHarness` owns a temporary directory holding the SQLite database and
//! the staging directory, and a `CardvaultConfig` pointing at both. Build a
//! vault from `harness.config` and inspect `staged_files()` afterwards.

use std::path::{Path, PathBuf};

use cardvault_config::CardvaultConfig;
use cardvault_core::{StagingMode, VaultError};

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    mode: StagingMode,
    prefix: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            mode: StagingMode::File,
            prefix: "cardvault-".to_string(),
        }
    }

    pub fn staging_mode(mut self, mode: StagingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn staging_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn build(self) -> Result<TestHarness, VaultError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| VaultError::Internal(format!("cannot create temp dir: {e}")))?;
        let staging_dir = temp_dir.path().join("staging");
        std::fs::create_dir(&staging_dir)
            .map_err(|e| VaultError::Internal(format!("cannot create staging dir: {e}")))?;

        let mut config = CardvaultConfig::default();
        config.storage.database_path = temp_dir.path().join("vault.db").display().to_string();
        config.staging.dir = staging_dir.display().to_string();
        config.staging.prefix = self.prefix;
        config.staging.mode = self.mode;
        config.token.verify_on_startup = false;

        Ok(TestHarness {
            config,
            staging_dir,
            _temp_dir: temp_dir,
        })
    }
}

/// Temporary database and staging directory, removed on drop.
pub struct TestHarness {
    /// Configuration pointing at the temp database and staging directory.
    pub config: CardvaultConfig,
    staging_dir: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings (file staging).
    pub fn new() -> Result<Self, VaultError> {
        Self::builder().build()
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Every file currently in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.staging_dir)
            .map(|entries| entries.flatten().map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    /// Drop a file into the staging directory as if left by a crashed run.
    pub fn plant_stale_artifact(&self, contents: &[u8]) -> Result<PathBuf, VaultError> {
        let path = self
            .staging_dir
            .join(format!("{}stale-artifact", self.config.staging.prefix));
        std::fs::write(&path, contents)
            .map_err(|e| VaultError::Internal(format!("cannot plant artifact: {e}")))?;
        Ok(path)
    }
}
