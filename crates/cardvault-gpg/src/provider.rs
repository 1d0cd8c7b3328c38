// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `EncryptionProvider` backed by the `gpg` executable.
//!
//! Encryption needs only the recipient's public key, which is handed to gpg
//! through a scratch file (`--recipient-file`) so no keyring import is
//! required. The plaintext goes over stdin and never touches disk.
//!
//! Decryption uses the recipient's private key as gpg-agent exposes it,
//! typically a smart card unlocked out of band.

use std::path::PathBuf;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use cardvault_config::model::GpgConfig;
use cardvault_core::{CiphertextSource, EncryptionProvider, StagingMode, VaultError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use zeroize::Zeroizing;

/// Encryption gateway over a local `gpg` installation.
#[derive(Debug, Clone)]
pub struct GpgProvider {
    pub(crate) binary: String,
    pub(crate) card_binary: String,
    pub(crate) homedir: Option<PathBuf>,
    staging_mode: StagingMode,
}

impl GpgProvider {
    pub fn new(config: &GpgConfig, staging_mode: StagingMode) -> Self {
        Self {
            binary: config.binary.clone(),
            card_binary: config.card_binary.clone(),
            homedir: config.homedir.as_ref().map(PathBuf::from),
            staging_mode,
        }
    }

    /// A gpg invocation with the common options applied.
    ///
    /// `kill_on_drop` makes a cancelled decrypt take the child down with it.
    pub(crate) fn gpg(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(homedir) = &self.homedir {
            cmd.arg("--homedir").arg(homedir);
        }
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl EncryptionProvider for GpgProvider {
    fn name(&self) -> &str {
        "gpg"
    }

    fn staging_mode(&self) -> StagingMode {
        self.staging_mode
    }

    async fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, VaultError> {
        if plaintext.is_empty() {
            return Err(encrypt_err("refusing to encrypt an empty secret"));
        }
        if public_key.is_empty() {
            return Err(encrypt_err("public key is empty"));
        }

        let key_file = write_key_file(public_key)
            .map_err(|e| encrypt_err(format!("cannot stage public key: {e}")))?;

        let mut cmd = self.gpg();
        cmd.args(["--batch", "--quiet", "--yes", "--armor"])
            .args(["--trust-model", "always"])
            .arg("--encrypt")
            .arg("--recipient-file")
            .arg(key_file.path());

        let output = run_with_stdin(cmd, Zeroizing::new(plaintext.to_vec()))
            .await
            .map_err(|e| encrypt_err(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(encrypt_err(gpg_failure(&output)));
        }
        if output.stdout.is_empty() {
            return Err(encrypt_err("gpg produced no ciphertext"));
        }

        debug!(bytes = output.stdout.len(), "secret encrypted");
        Ok(output.stdout)
    }

    async fn decrypt(
        &self,
        source: CiphertextSource<'_>,
        recipient: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let mut cmd = self.gpg();
        cmd.args(["--decrypt", "--quiet", "--batch", "--yes", "--armor"])
            .arg("--recipient")
            .arg(recipient);

        let output = match source {
            CiphertextSource::Staged(path) => {
                cmd.arg(path)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
                cmd.output().await
            }
            CiphertextSource::InMemory(ciphertext) => {
                run_with_stdin(cmd, Zeroizing::new(ciphertext.to_vec())).await
            }
        }
        .map_err(|e| decrypt_err(format!("failed to run {}: {e}", self.binary)))?;

        let Output { status, stdout, stderr } = output;
        let plaintext = Zeroizing::new(stdout);

        if !status.success() {
            return Err(decrypt_err(describe_failure(status, &stderr)));
        }
        if plaintext.is_empty() {
            return Err(decrypt_err("gpg produced no plaintext"));
        }

        debug!(recipient = %recipient, "ciphertext decrypted");
        Ok(plaintext)
    }
}

fn encrypt_err(reason: impl Into<String>) -> VaultError {
    VaultError::EncryptionFailed {
        reason: reason.into(),
    }
}

fn decrypt_err(reason: impl Into<String>) -> VaultError {
    VaultError::DecryptionFailed {
        reason: reason.into(),
    }
}

/// Public keys are not secret; a scratch file is fine.
fn write_key_file(public_key: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
    use std::io::Write;

    let mut file = tempfile::Builder::new().prefix("cardvault-pubkey-").tempfile()?;
    file.write_all(public_key)?;
    file.flush()?;
    Ok(file)
}

/// Spawn `cmd`, feed `input` on stdin, and collect stdout/stderr.
///
/// stdin is written from a separate task so a child that fills its stdout
/// pipe before draining stdin cannot deadlock us.
async fn run_with_stdin(mut cmd: Command, input: Zeroizing<Vec<u8>>) -> std::io::Result<Output> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("child stdin unavailable"))?;
    let writer = tokio::spawn(async move {
        // A child that exits early closes the pipe; its exit status tells
        // the real story, so the write error is dropped.
        let _ = stdin.write_all(&input).await;
        let _ = stdin.shutdown().await;
    });

    let output = child.wait_with_output().await?;
    let _ = writer.await;
    Ok(output)
}

fn gpg_failure(output: &Output) -> String {
    describe_failure(output.status, &output.stderr)
}

/// Last non-empty stderr line, which is where gpg puts the actual reason.
fn describe_failure(status: std::process::ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    match stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => format!("{line} ({status})"),
        None => format!("gpg {status}"),
    }
}
