// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cardvault doctor` command implementation.
//!
//! Runs diagnostic checks against the local environment: configuration,
//! database, gpg toolchain, hardware token, and the staging directory.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use cardvault_config::CardvaultConfig;
use cardvault_core::VaultError;
use cardvault_gpg::GpgProvider;
use cardvault_storage::SqliteStore;
use cardvault_vault::StagingArea;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `cardvault doctor` command. With `plain`, disables colored output.
pub async fn run_doctor(config: &CardvaultConfig, plain: bool) -> Result<(), VaultError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let provider = GpgProvider::new(&config.gpg, config.staging.mode);

    let results = vec![
        check_database(&config.storage.database_path, config.storage.wal_mode).await,
        check_gpg(&provider).await,
        check_token(&provider).await,
        check_staging(&StagingArea::from_config(&config.staging)),
    ];

    println!();
    println!("  cardvault doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", render_line(result, use_color));
    }

    println!();
    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    use colored::Colorize;

    let duration_ms = result.duration.as_millis();
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        );
    }

    let (symbol, message) = match result.status {
        CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
        CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
        CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
    };
    format!(
        "    {symbol} {:<20} {message} ({duration_ms}ms)",
        result.name
    )
}

/// Open the database (running migrations) and probe it.
async fn check_database(db_path: &str, wal_mode: bool) -> CheckResult {
    let start = Instant::now();

    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let config = cardvault_config::model::StorageConfig {
        database_path: db_path.to_string(),
        wal_mode,
    };
    match SqliteStore::open(&config).await {
        Ok(store) => match store.health_check().await {
            Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
            Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
        },
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start),
    }
}

async fn check_gpg(provider: &GpgProvider) -> CheckResult {
    let start = Instant::now();
    match provider.check_installed().await {
        Ok(banner) => CheckResult::new("gpg", CheckStatus::Pass, banner, start),
        Err(e) => CheckResult::new("gpg", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Non-interactive: only asks gpg whether a card is visible.
async fn check_token(provider: &GpgProvider) -> CheckResult {
    let start = Instant::now();
    match provider.card_present().await {
        Ok(true) => CheckResult::new("Hardware token", CheckStatus::Pass, "card present", start),
        Ok(false) => CheckResult::new(
            "Hardware token",
            CheckStatus::Warn,
            "no card detected (insert it before retrieving secrets)",
            start,
        ),
        Err(e) => CheckResult::new("Hardware token", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Stage and erase a probe file, then report leftovers from unclean exits.
fn check_staging(area: &StagingArea) -> CheckResult {
    let start = Instant::now();
    let dir = area.dir().display().to_string();
    if !area.dir().exists() {
        return CheckResult::new(
            "Staging directory",
            CheckStatus::Warn,
            format!("not found: {dir} (will be created on first run)"),
            start,
        );
    }

    let probe = match area.stage(b"cardvault doctor probe") {
        Ok(probe) => probe,
        Err(e) => return CheckResult::new("Staging directory", CheckStatus::Fail, e.to_string(), start),
    };
    if let Err(e) = probe.erase() {
        return CheckResult::new("Staging directory", CheckStatus::Fail, e.to_string(), start);
    }

    let leftovers = std::fs::read_dir(area.dir())
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|n| n.starts_with(area.prefix()))
                })
                .count()
        })
        .unwrap_or(0);

    if leftovers > 0 {
        CheckResult::new(
            "Staging directory",
            CheckStatus::Warn,
            format!("{leftovers} stale artifact(s) in {dir} (purged on next start)"),
            start,
        )
    } else {
        CheckResult::new("Staging directory", CheckStatus::Pass, format!("{dir} writable"), start)
    }
}
