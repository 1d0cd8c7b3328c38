// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret acquisition via TTY prompt or the CARDVAULT_SECRET environment variable.

use std::io::{BufRead, IsTerminal, Write};

use cardvault_core::VaultError;
use secrecy::SecretString;

/// The environment variable that supplies an account secret non-interactively.
pub const SECRET_ENV_VAR: &str = "CARDVAULT_SECRET";

/// Get an account secret from the environment or an interactive prompt.
///
/// Priority:
/// 1. `CARDVAULT_SECRET` environment variable (for scripts)
/// 2. Hidden TTY prompt via `rpassword`, entered twice
pub fn read_secret() -> Result<SecretString, VaultError> {
    if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
        if !secret.is_empty() {
            return Ok(SecretString::from(secret));
        }
    }

    if std::io::stdin().is_terminal() {
        let first = rpassword::prompt_password("Secret: ")
            .map_err(|e| VaultError::InvalidInput(format!("failed to read secret: {e}")))?;
        let second = rpassword::prompt_password("Confirm secret: ")
            .map_err(|e| VaultError::InvalidInput(format!("failed to read secret: {e}")))?;
        if first != second {
            return Err(VaultError::InvalidInput("secrets do not match".to_string()));
        }
        if first.is_empty() {
            return Err(VaultError::InvalidInput("secret must not be empty".to_string()));
        }
        return Ok(SecretString::from(first));
    }

    Err(VaultError::InvalidInput(format!(
        "no secret provided; set {SECRET_ENV_VAR} or run interactively"
    )))
}

/// Run a blocking terminal read on the blocking pool, leaving the calling
/// task free to be cancelled while the user types.
pub async fn off_task<T, F>(read: F) -> Result<T, VaultError>
where
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| VaultError::Internal(format!("terminal reader failed: {e}")))?
}

/// Print `message` and wait for Enter.
pub fn pause(message: &str) -> Result<(), VaultError> {
    eprint!("{message}");
    std::io::stderr()
        .flush()
        .map_err(|e| VaultError::Internal(format!("cannot write prompt: {e}")))?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| VaultError::Internal(format!("cannot read from terminal: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn secret_from_env_var() {
        // SAFETY: test-only env mutation, serialized with #[serial].
        unsafe { std::env::set_var(SECRET_ENV_VAR, "hunter2") };
        let result = read_secret();
        unsafe { std::env::remove_var(SECRET_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "hunter2");
    }

    #[tokio::test]
    #[serial]
    async fn secret_read_off_task() {
        // SAFETY: test-only env mutation, serialized with #[serial].
        unsafe { std::env::set_var(SECRET_ENV_VAR, "hunter2") };
        let result = off_task(read_secret).await;
        unsafe { std::env::remove_var(SECRET_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "hunter2");
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        // SAFETY: test-only env mutation, serialized with #[serial].
        unsafe { std::env::set_var(SECRET_ENV_VAR, "") };
        let result = read_secret();
        unsafe { std::env::remove_var(SECRET_ENV_VAR) };

        // Under `cargo test` stdin is not a terminal, so this must fail.
        if !std::io::stdin().is_terminal() {
            assert!(matches!(result, Err(VaultError::InvalidInput(_))));
        }
    }
}
