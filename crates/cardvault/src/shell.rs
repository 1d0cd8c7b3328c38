// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cardvault shell` command implementation.
//!
//! A numbered menu over the vault operations, read with rustyline. Ctrl+C
//! or Ctrl+D at any prompt leaves the shell; the caller purges staging.

use std::path::Path;

use cardvault_config::CardvaultConfig;
use cardvault_config::model::StorageConfig;
use cardvault_core::VaultError;
use cardvault_vault::Vault;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{commands, prompt};

/// Entries of the main menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Connect,
    AddKey,
    AddAccount,
    Retrieve,
    Delete,
    ListAccounts,
    ListKeys,
    Exit,
}

impl MenuItem {
    const ALL: [MenuItem; 8] = [
        MenuItem::Connect,
        MenuItem::AddKey,
        MenuItem::AddAccount,
        MenuItem::Retrieve,
        MenuItem::Delete,
        MenuItem::ListAccounts,
        MenuItem::ListKeys,
        MenuItem::Exit,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuItem::Connect => "Connect to database",
            MenuItem::AddKey => "Add public key",
            MenuItem::AddAccount => "Add account",
            MenuItem::Retrieve => "Retrieve account",
            MenuItem::Delete => "Delete account",
            MenuItem::ListAccounts => "List accounts",
            MenuItem::ListKeys => "List keys",
            MenuItem::Exit => "Exit",
        }
    }

    fn parse(input: &str) -> Option<Self> {
        let n: usize = input.trim().parse().ok()?;
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Outcome of one prompt: an answer, or the user backed out.
type Answer = Option<String>;

/// Runs the interactive menu until Exit, Ctrl+C/Ctrl+D, or cancellation.
pub async fn run_shell(
    vault: &mut Vault,
    config: &CardvaultConfig,
    cancel: &CancellationToken,
) -> Result<(), VaultError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| VaultError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "cardvault shell".bold().green());
    println!("Connected to {}\n", config.storage.database_path.yellow());

    let menu_prompt = format!("{}> ", "cardvault".green());
    loop {
        if cancel.is_cancelled() {
            break;
        }
        print_menu();

        let Some(choice) = ask(&mut rl, &menu_prompt)? else {
            break;
        };
        let Some(item) = MenuItem::parse(&choice) else {
            eprintln!("{}: enter a number between 1 and {}", "error".red(), MenuItem::ALL.len());
            continue;
        };
        if item == MenuItem::Exit {
            break;
        }

        debug!(item = item.label(), "shell menu selection");
        match handle(item, &mut rl, vault, config, cancel).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(VaultError::NoKeysRegistered) => {
                println!("{}", "Database empty: register a public key first.".yellow());
            }
            Err(e) if e.is_fatal() || matches!(e, VaultError::Cancelled) => return Err(e),
            Err(e) => eprintln!("{}: {e}", "error".red()),
        }
        println!();
    }

    Ok(())
}

fn print_menu() {
    for (i, item) in MenuItem::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, item.label());
    }
}

/// Run one menu item. `Ok(false)` means the user backed out of a prompt.
async fn handle(
    item: MenuItem,
    rl: &mut DefaultEditor,
    vault: &mut Vault,
    config: &CardvaultConfig,
    cancel: &CancellationToken,
) -> Result<bool, VaultError> {
    match item {
        MenuItem::Connect => {
            let Some(path) = ask(rl, "Database path (empty for configured): ")? else {
                return Ok(false);
            };
            let database_path = if path.is_empty() {
                config.storage.database_path.clone()
            } else {
                path
            };
            let storage = StorageConfig {
                database_path,
                wal_mode: config.storage.wal_mode,
            };
            vault.reconnect(&storage).await?;
            println!("Connected to {}", storage.database_path.yellow());
        }
        MenuItem::AddKey => {
            let Some(recipient) = ask(rl, "Recipient: ")? else {
                return Ok(false);
            };
            let Some(key_file) = ask(rl, "Public key file: ")? else {
                return Ok(false);
            };
            commands::add_key(vault, &recipient, Some(Path::new(&key_file))).await?;
        }
        MenuItem::AddAccount => {
            let recipients = vault.recipient_choices().await?;
            let Some(name) = ask(rl, "Account name: ")? else {
                return Ok(false);
            };
            let Some(username) = ask(rl, "Username: ")? else {
                return Ok(false);
            };
            let Some(recipient) = choose(rl, "Recipient", &recipients)? else {
                return Ok(false);
            };
            let secret = prompt::off_task(prompt::read_secret).await?;
            let record = vault
                .add_account(&name, &username, secret.expose_secret().as_bytes(), &recipient)
                .await?;
            println!("Stored account {} for {}", record.name, record.recipient);
        }
        MenuItem::Retrieve => {
            let names = account_names(vault).await?;
            if names.is_empty() {
                println!("{}", "Database empty".yellow());
                return Ok(true);
            }
            let Some(name) = choose(rl, "Account", &names)? else {
                return Ok(false);
            };
            let secret = vault.retrieve_account_cancellable(&name, cancel).await?;
            println!("Password: {}", secret.as_str()?);
        }
        MenuItem::Delete => {
            let names = account_names(vault).await?;
            if names.is_empty() {
                println!("{}", "Database empty".yellow());
                return Ok(true);
            }
            let Some(name) = choose(rl, "Account", &names)? else {
                return Ok(false);
            };
            let Some(confirm) = ask(rl, &format!("Delete {name}? [y/N] "))? else {
                return Ok(false);
            };
            if confirm.eq_ignore_ascii_case("y") {
                commands::delete(vault, &name).await?;
            } else {
                println!("Kept {name}");
            }
        }
        MenuItem::ListAccounts => commands::list(vault).await?,
        MenuItem::ListKeys => commands::keys(vault).await?,
        MenuItem::Exit => return Ok(false),
    }
    Ok(true)
}

async fn account_names(vault: &Vault) -> Result<Vec<String>, VaultError> {
    Ok(vault
        .list_accounts()
        .await?
        .into_iter()
        .map(|a| a.name)
        .collect())
}

fn choose(rl: &mut DefaultEditor, what: &str, options: &[String]) -> Result<Answer, VaultError> {
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
    loop {
        let Some(answer) = ask(rl, &format!("{what}: "))? else {
            return Ok(None);
        };
        match pick(options, &answer) {
            Some(choice) => return Ok(Some(choice.to_string())),
            None => eprintln!("{}: no {} matches `{answer}`", "error".red(), what.to_lowercase()),
        }
    }
}

/// Resolve a 1-based index or an exact name against `options`.
fn pick<'a>(options: &'a [String], answer: &str) -> Option<&'a str> {
    let answer = answer.trim();
    if let Ok(n) = answer.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| options.get(i))
            .map(String::as_str);
    }
    options.iter().find(|o| o.as_str() == answer).map(String::as_str)
}

/// Read one trimmed line. `None` on Ctrl+C or Ctrl+D.
fn ask(rl: &mut DefaultEditor, prompt: &str) -> Result<Answer, VaultError> {
    match rl.readline(prompt) {
        Ok(line) => {
            let trimmed = line.trim().to_string();
            if !trimmed.is_empty() {
                let _ = rl.add_history_entry(&trimmed);
            }
            Ok(Some(trimmed))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(VaultError::Internal(format!("readline failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_numbers_are_one_based() {
        assert_eq!(MenuItem::parse("1"), Some(MenuItem::Connect));
        assert_eq!(MenuItem::parse(" 4 "), Some(MenuItem::Retrieve));
        assert_eq!(MenuItem::parse("8"), Some(MenuItem::Exit));
        assert_eq!(MenuItem::parse("0"), None);
        assert_eq!(MenuItem::parse("9"), None);
        assert_eq!(MenuItem::parse("retrieve"), None);
    }

    #[test]
    fn pick_by_index_or_name() {
        let options = vec!["email".to_string(), "bank".to_string(), "2".to_string()];
        assert_eq!(pick(&options, "1"), Some("email"));
        assert_eq!(pick(&options, "bank"), Some("bank"));
        // Numeric answers are positions, never names.
        assert_eq!(pick(&options, "2"), Some("bank"));
        assert_eq!(pick(&options, "0"), None);
        assert_eq!(pick(&options, "4"), None);
        assert_eq!(pick(&options, "Email"), None);
    }
}
