// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup checks for the gpg toolchain and the hardware token.

use std::process::Stdio;

use cardvault_core::VaultError;
use tokio::process::Command;
use tracing::{debug, info};

use crate::provider::GpgProvider;

impl GpgProvider {
    /// Confirm the gpg binary runs, returning its version banner.
    pub async fn check_installed(&self) -> Result<String, VaultError> {
        let output = self
            .gpg()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unusable(e))?;

        if !output.status.success() {
            return Err(VaultError::Config(format!(
                "`{} --version` exited with {}",
                self.binary, output.status
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!(version = %banner, "gpg found");
        Ok(banner)
    }

    /// Ask the card tool to verify the token PIN.
    ///
    /// Runs attached to the terminal because the tool prompts the operator.
    pub async fn verify_card(&self) -> Result<(), VaultError> {
        info!("verifying hardware token");
        let status = Command::new(&self.card_binary)
            .arg("verify")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| VaultError::DecryptionFailed {
                reason: format!("cannot run `{}`: {e}", self.card_binary),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(VaultError::DecryptionFailed {
                reason: format!("hardware token verification failed ({status})"),
            })
        }
    }

    fn unusable(&self, e: std::io::Error) -> VaultError {
        VaultError::Config(format!("gpg binary `{}` is not usable: {e}", self.binary))
    }

    /// Non-interactive probe: is a smart card visible to gpg right now?
    pub async fn card_present(&self) -> Result<bool, VaultError> {
        let output = self
            .gpg()
            .args(["--batch", "--card-status"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unusable(e))?;
        Ok(output.status.success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use cardvault_config::model::GpgConfig;
    use cardvault_core::StagingMode;

    use super::*;
    use crate::provider::tests::{FAKE_GPG, install_script, provider_with};

    #[tokio::test]
    #[serial_test::serial]
    async fn check_installed_reports_version_banner() {
        let dir = tempfile::tempdir().unwrap();
        let gpg = install_script(dir.path(), "gpg", FAKE_GPG);
        let provider = provider_with(gpg, StagingMode::File);

        let banner = provider.check_installed().await.unwrap();
        assert_eq!(banner, "gpg (GnuPG) 2.4.4");
    }

    #[tokio::test]
    async fn check_installed_fails_for_missing_binary() {
        let provider = provider_with("/nonexistent/cardvault-gpg".into(), StagingMode::File);
        let err = provider.check_installed().await.unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn card_status_follows_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        // FAKE_GPG exits 1 for anything it does not recognise.
        let gpg = install_script(dir.path(), "gpg", FAKE_GPG);
        let provider = provider_with(gpg, StagingMode::File);
        assert!(!provider.card_present().await.unwrap());

        let present = install_script(dir.path(), "gpg-present", "#!/bin/sh\nexit 0\n");
        let provider = provider_with(present, StagingMode::File);
        assert!(provider.card_present().await.unwrap());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn verify_card_maps_failure_to_decryption_error() {
        let dir = tempfile::tempdir().unwrap();
        let card = install_script(dir.path(), "gpg-card", "#!/bin/sh\nexit 3\n");
        let provider = GpgProvider::new(
            &GpgConfig {
                binary: "gpg".into(),
                card_binary: card,
                homedir: None,
            },
            StagingMode::File,
        );

        let err = provider.verify_card().await.unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed { .. }));
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn verify_card_succeeds_on_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let card = install_script(dir.path(), "gpg-card", "#!/bin/sh\nexit 0\n");
        let provider = GpgProvider::new(
            &GpgConfig {
                binary: "gpg".into(),
                card_binary: card,
                homedir: None,
            },
            StagingMode::File,
        );
        provider.verify_card().await.unwrap();
    }
}
