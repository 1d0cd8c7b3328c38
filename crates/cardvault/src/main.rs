// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cardvault - a local credential vault whose secrets are encrypted to
//! OpenPGP keys held on a hardware token.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod doctor;
mod prompt;
mod shell;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use cardvault_config::CardvaultConfig;
use cardvault_core::VaultError;
use cardvault_gpg::GpgProvider;
use cardvault_vault::Vault;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// Exit code when staged material could not be erased.
pub(crate) const EXIT_FATAL: i32 = 2;

/// Exit code after an interrupt, following the shell convention.
pub(crate) const EXIT_INTERRUPTED: i32 = 130;

/// Cardvault - a hardware-token backed credential vault.
#[derive(Parser, Debug)]
#[command(name = "cardvault", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Do not ask for the hardware token before decrypting.
    #[arg(long, global = true)]
    skip_token_check: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a recipient's ASCII-armored public key.
    AddKey {
        /// Recipient identifier passed to gpg (e-mail or key id).
        recipient: String,
        /// Read the key from this file instead of stdin.
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    /// Encrypt a new secret to a registered recipient and store it.
    AddAccount {
        name: String,
        username: String,
        recipient: String,
    },
    /// Decrypt an account's secret and print it.
    Get { name: String },
    /// Delete an account by name.
    Delete { name: String },
    /// List stored accounts.
    List,
    /// List registered public keys.
    Keys,
    /// Run diagnostic checks.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Launch the interactive menu.
    Shell,
}

impl Commands {
    /// Commands that decrypt and therefore need the token present.
    fn needs_token(&self) -> bool {
        matches!(self, Commands::Get { .. } | Commands::Shell)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => cardvault_config::load_and_validate_path(path),
        None => cardvault_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            cardvault_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);

    let command = cli.command.unwrap_or(Commands::Shell);
    if let Commands::Doctor { plain } = command {
        if let Err(e) = doctor::run_doctor(&config, plain).await {
            report_and_exit(e);
        }
        return;
    }

    if let Err(e) = run(&config, command, cli.skip_token_check).await {
        report_and_exit(e);
    }
}

async fn run(config: &CardvaultConfig, command: Commands, skip_token_check: bool) -> Result<(), VaultError> {
    let provider = GpgProvider::new(&config.gpg, config.staging.mode);
    let banner = provider.check_installed().await?;
    tracing::debug!(gpg = %banner, "gpg available");

    if command.needs_token() && config.token.verify_on_startup && !skip_token_check {
        prompt::pause("Please insert your hardware token and press Enter...")?;
        provider.verify_card().await?;
    }

    let mut vault = Vault::connect(config, Arc::new(provider)).await?;
    let cancel = shutdown::install_signal_handler(vault.staging_registry());

    let result = shutdown::until_cancelled(&cancel, dispatch(&mut vault, config, command, &cancel)).await;
    // Purge before close so an interrupted command leaves nothing behind.
    shutdown::purge(&vault.staging_registry());
    vault.close().await?;
    result
}

async fn dispatch(
    vault: &mut Vault,
    config: &CardvaultConfig,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<(), VaultError> {
    match command {
        Commands::AddKey { recipient, key_file } => {
            commands::add_key(vault, &recipient, key_file.as_deref()).await
        }
        Commands::AddAccount { name, username, recipient } => {
            commands::add_account(vault, &name, &username, &recipient).await
        }
        Commands::Get { name } => commands::get(vault, &name, cancel).await,
        Commands::Delete { name } => commands::delete(vault, &name).await,
        Commands::List => commands::list(vault).await,
        Commands::Keys => commands::keys(vault).await,
        Commands::Shell => shell::run_shell(vault, config, cancel).await,
        Commands::Doctor { .. } => Ok(()),
    }
}

fn report_and_exit(error: VaultError) -> ! {
    eprintln!("cardvault: {error}");
    let code = if error.is_fatal() {
        EXIT_FATAL
    } else if matches!(error, VaultError::Cancelled) {
        EXIT_INTERRUPTED
    } else {
        1
    };
    std::process::exit(code);
}

/// Initialize the tracing subscriber with an env filter.
///
/// Logs go to stderr so `cardvault get` output stays pipeable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cardvault={log_level},cardvault_vault={log_level},cardvault_gpg={log_level},\
             cardvault_storage={log_level},cardvault_config={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_is_valid() {
        let config = cardvault_config::load_and_validate_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert!(config.token.verify_on_startup);
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["cardvault", "add-account", "email", "a@x.com", "alice"]).unwrap();
        match cli.command {
            Some(Commands::AddAccount { name, username, recipient }) => {
                assert_eq!((name.as_str(), username.as_str(), recipient.as_str()), ("email", "a@x.com", "alice"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["cardvault", "get", "email", "--skip-token-check"]).unwrap();
        assert!(cli.skip_token_check);
        assert!(cli.command.unwrap().needs_token());

        let cli = Cli::try_parse_from(["cardvault", "-c", "/tmp/cv.toml", "list"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cv.toml")));
        assert!(!cli.command.unwrap().needs_token());
    }

    #[test]
    fn no_subcommand_is_accepted() {
        let cli = Cli::try_parse_from(["cardvault"]).unwrap();
        assert!(cli.command.is_none());
    }
}
