// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted message drafts, one per identity.

use rusqlite::{OptionalExtension, params};

use parley_core::{MessageDraft, ParleyError};

use crate::database::Database;

/// Stores the draft, replacing any previous one. An empty draft clears
/// the row instead.
pub async fn set(db: &Database, user_key: &str, draft: &MessageDraft) -> Result<(), ParleyError> {
    if draft.is_empty() {
        return clear(db, user_key).await;
    }
    let user_key = user_key.to_string();
    let body = serde_json::to_string(draft).map_err(|e| ParleyError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO drafts (user_key, body) VALUES (?1, ?2)",
                params![user_key, body],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get(db: &Database, user_key: &str) -> Result<MessageDraft, ParleyError> {
    let user_key = user_key.to_string();
    let body: Option<String> = db
        .connection()
        .call(move |conn| {
            let body = conn
                .query_row(
                    "SELECT body FROM drafts WHERE user_key = ?1",
                    params![user_key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(body)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match body {
        Some(body) => serde_json::from_str(&body).map_err(|e| ParleyError::Storage {
            source: Box::new(e),
        }),
        None => Ok(MessageDraft::default()),
    }
}

/// Returns the draft and clears it in the same transaction, so a crash
/// between read and delete cannot resurrect an already-sent draft.
pub async fn take(db: &Database, user_key: &str) -> Result<MessageDraft, ParleyError> {
    let user_key = user_key.to_string();
    let body: Option<String> = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let body = tx
                .query_row(
                    "SELECT body FROM drafts WHERE user_key = ?1",
                    params![user_key],
                    |row| row.get(0),
                )
                .optional()?;
            tx.execute("DELETE FROM drafts WHERE user_key = ?1", params![user_key])?;
            tx.commit()?;
            Ok(body)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match body {
        Some(body) => serde_json::from_str(&body).map_err(|e| ParleyError::Storage {
            source: Box::new(e),
        }),
        None => Ok(MessageDraft::default()),
    }
}

pub async fn clear(db: &Database, user_key: &str) -> Result<(), ParleyError> {
    let user_key = user_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM drafts WHERE user_key = ?1", params![user_key])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
