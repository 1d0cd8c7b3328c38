// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Public key record operations.

use cardvault_core::{InsertKey, KeyRecord, VaultError};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, check_violation, is_unique_violation, map_tr_err};

const KEY_COLUMNS: &str = "id, recipient, public_key, created_at";

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<KeyRecord> {
    Ok(KeyRecord {
        id: row.get(0)?,
        recipient: row.get(1)?,
        public_key: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Insert a key. A UNIQUE violation on `recipient` is reported, not raised.
pub async fn insert_key(
    db: &Database,
    recipient: &str,
    public_key: &[u8],
) -> Result<InsertKey, VaultError> {
    let recipient = recipient.to_string();
    let public_key = public_key.to_vec();
    db.connection()
        .call(move |conn| -> Result<Result<InsertKey, VaultError>, rusqlite::Error> {
            match conn.execute(
                "INSERT INTO public_keys (recipient, public_key) VALUES (?1, ?2)",
                params![recipient, public_key],
            ) {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(Ok(InsertKey::DuplicateRecipient)),
                Err(e) => match check_violation(&e) {
                    Some(rejected) => return Ok(Err(rejected)),
                    None => return Err(e),
                },
            }
            let id = conn.last_insert_rowid();
            let record = conn.query_row(
                &format!("SELECT {KEY_COLUMNS} FROM public_keys WHERE id = ?1"),
                params![id],
                key_from_row,
            )?;
            Ok(Ok(InsertKey::Created(record)))
        })
        .await
        .map_err(map_tr_err)?
}

/// Get a key by recipient.
pub async fn get_key(db: &Database, recipient: &str) -> Result<Option<KeyRecord>, VaultError> {
    let recipient = recipient.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<KeyRecord>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {KEY_COLUMNS} FROM public_keys WHERE recipient = ?1"),
                params![recipient],
                key_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List every key in insertion order.
pub async fn list_keys(db: &Database) -> Result<Vec<KeyRecord>, VaultError> {
    db.connection()
        .call(|conn| -> Result<Vec<KeyRecord>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {KEY_COLUMNS} FROM public_keys ORDER BY id"))?;
            let rows = stmt.query_map([], key_from_row)?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn insert_and_get_key_roundtrips() {
        let (db, _dir) = setup_db().await;

        let created = match insert_key(&db, "alice", b"PUBKEY-A").await.unwrap() {
            InsertKey::Created(k) => k,
            other => panic!("expected Created, got {other:?}"),
        };
        assert_eq!(created.recipient, "alice");
        assert_eq!(created.public_key, b"PUBKEY-A");
        assert!(!created.created_at.is_empty());

        let fetched = get_key(&db, "alice").await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn duplicate_recipient_is_reported() {
        let (db, _dir) = setup_db().await;
        insert_key(&db, "alice", b"K1").await.unwrap();

        let second = insert_key(&db, "alice", b"K2").await.unwrap();
        assert_eq!(second, InsertKey::DuplicateRecipient);

        let keys = list_keys(&db).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].public_key, b"K1");
    }

    #[tokio::test]
    async fn get_missing_key_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_key(&db, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_keys_preserves_insertion_order() {
        let (db, _dir) = setup_db().await;
        for r in ["zed", "alice", "mike"] {
            insert_key(&db, r, b"K").await.unwrap();
        }
        let order: Vec<String> = list_keys(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.recipient)
            .collect();
        assert_eq!(order, vec!["zed", "alice", "mike"]);
    }

    #[tokio::test]
    async fn empty_public_key_is_invalid_input() {
        let (db, _dir) = setup_db().await;
        let result = insert_key(&db, "alice", b"").await;
        assert!(matches!(result, Err(VaultError::InvalidInput(_))), "{result:?}");
        assert!(list_keys(&db).await.unwrap().is_empty());
    }
}
