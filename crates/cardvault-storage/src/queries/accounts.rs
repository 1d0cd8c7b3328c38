// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account record operations.

use cardvault_core::{AccountRecord, InsertAccount, NewAccount, VaultError};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, check_violation, is_unique_violation, map_tr_err};

const ACCOUNT_COLUMNS: &str = "id, name, username, ciphertext, recipient, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<AccountRecord> {
    Ok(AccountRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        ciphertext: row.get(3)?,
        recipient: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert an account if its recipient has a registered key.
///
/// The recipient check and the insert are one statement, so a key cannot
/// vanish between the two.
pub async fn insert_account(db: &Database, account: NewAccount) -> Result<InsertAccount, VaultError> {
    db.connection()
        .call(move |conn| -> Result<Result<InsertAccount, VaultError>, rusqlite::Error> {
            let inserted = match conn.execute(
                "INSERT INTO accounts (name, username, ciphertext, recipient)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE EXISTS (SELECT 1 FROM public_keys WHERE recipient = ?4)",
                params![
                    account.name,
                    account.username,
                    account.ciphertext,
                    account.recipient,
                ],
            ) {
                Ok(n) => n,
                Err(e) if is_unique_violation(&e) => return Ok(Ok(InsertAccount::DuplicateName)),
                Err(e) => match check_violation(&e) {
                    Some(rejected) => return Ok(Err(rejected)),
                    None => return Err(e),
                },
            };
            if inserted == 0 {
                return Ok(Ok(InsertAccount::UnknownRecipient));
            }
            let id = conn.last_insert_rowid();
            let record = conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )?;
            Ok(Ok(InsertAccount::Created(record)))
        })
        .await
        .map_err(map_tr_err)?
}

/// Get an account by name.
pub async fn get_account(db: &Database, name: &str) -> Result<Option<AccountRecord>, VaultError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<AccountRecord>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE name = ?1"),
                params![name],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List every account in insertion order.
pub async fn list_accounts(db: &Database) -> Result<Vec<AccountRecord>, VaultError> {
    db.connection()
        .call(|conn| -> Result<Vec<AccountRecord>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"))?;
            let rows = stmt.query_map([], account_from_row)?;
            let mut accounts = Vec::new();
            for row in rows {
                accounts.push(row?);
            }
            Ok(accounts)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete accounts by name, returning the number of rows removed.
pub async fn delete_account(db: &Database, name: &str) -> Result<usize, VaultError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM accounts WHERE name = ?1", params![name])
        })
        .await
        .map_err(map_tr_err)
}
