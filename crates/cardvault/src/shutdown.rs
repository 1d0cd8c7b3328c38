// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling: purge staged artifacts and cancel the running command.
//!
//! On SIGINT or SIGTERM every live staging artifact is erased first, then
//! the returned [`CancellationToken`] is cancelled. A pending decrypt
//! unwinds (killing the gpg child) and [`until_cancelled`] abandons any
//! other command. If the process is still alive after [`EXIT_GRACE`] it
//! exits with the interrupt status.

use std::time::Duration;

use cardvault_core::VaultError;
use cardvault_vault::StagingRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long a cancelled command gets to unwind before the forced exit.
pub const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Installs handlers for SIGTERM and SIGINT.
///
/// The handler task runs in the background until a signal arrives.
pub fn install_signal_handler(registry: StagingRegistry) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        shut_down(&registry, &token_clone, EXIT_GRACE, |code| std::process::exit(code)).await;
    });

    token
}

/// Drive `work` unless the token fires first, which yields `Cancelled`.
pub async fn until_cancelled<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T, VaultError>>,
) -> Result<T, VaultError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VaultError::Cancelled),
        result = work => result,
    }
}

async fn shut_down(
    registry: &StagingRegistry,
    token: &CancellationToken,
    grace: Duration,
    exit: impl FnOnce(i32),
) {
    purge(registry);
    token.cancel();
    debug!("shutdown signal handler completed");

    // Reached only when the main task is stuck outside the runtime's reach.
    tokio::time::sleep(grace).await;
    warn!(grace_ms = grace.as_millis() as u64, "command did not stop after the signal, exiting");
    exit(crate::EXIT_INTERRUPTED);
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        info!("received SIGINT (Ctrl+C), shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, relying on Ctrl+C only");
                let _ = ctrl_c.await;
                info!("received SIGINT (Ctrl+C), shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, shutting down");
    }
}

/// Erase every live artifact. A failure here is fatal.
pub fn purge(registry: &StagingRegistry) {
    match registry.purge_all() {
        Ok(0) => {}
        Ok(n) => info!(count = n, "purged staged artifacts"),
        Err(e) => {
            error!(error = %e, "could not purge staged artifacts");
            std::process::exit(crate::EXIT_FATAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use cardvault_vault::StagingArea;

    use super::*;

    #[test]
    fn purge_erases_live_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(dir.path(), "cardvault-");
        let artifact = area.stage(b"CIPHERTEXT").unwrap();
        let path = artifact.path().to_path_buf();

        purge(area.registry());
        assert!(!path.exists());
        assert!(area.registry().is_empty());
        drop(artifact);
    }

    #[tokio::test]
    async fn handler_does_not_fire_without_a_signal() {
        let token = install_signal_handler(StagingRegistry::new());
        tokio::task::yield_now().await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_abandons_a_blocked_read() {
        let token = CancellationToken::new();
        let (tx, rx) = std::sync::mpsc::channel::<Vec<u8>>();
        // Stands in for add-key waiting on stdin.
        let reading = crate::prompt::off_task(move || {
            rx.recv().map_err(|e| VaultError::Internal(e.to_string()))
        });

        let canceller = token.clone();
        tokio::spawn(async move { canceller.cancel() });

        let result = until_cancelled(&token, reading).await;
        assert!(matches!(result, Err(VaultError::Cancelled)), "{result:?}");
        drop(tx);
    }

    #[tokio::test]
    async fn finished_work_wins_over_an_idle_token() {
        let token = CancellationToken::new();
        let result = until_cancelled(&token, async { Ok::<_, VaultError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_purges_cancels_then_exits_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(dir.path(), "cardvault-");
        let artifact = area.stage(b"CIPHERTEXT").unwrap();
        let path = artifact.path().to_path_buf();
        let token = CancellationToken::new();

        let start = tokio::time::Instant::now();
        let mut exit_code = None;
        shut_down(area.registry(), &token, EXIT_GRACE, |code| exit_code = Some(code)).await;

        assert_eq!(exit_code, Some(crate::EXIT_INTERRUPTED));
        assert!(start.elapsed() >= EXIT_GRACE);
        assert!(token.is_cancelled());
        assert!(!path.exists());
        assert!(area.registry().is_empty());
        drop(artifact);
    }
}
