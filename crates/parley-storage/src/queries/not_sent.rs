// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Not-sent message shadow copies, keyed by local id.

use rusqlite::params;

use parley_core::{Message, ParleyError};

use crate::database::Database;

/// Insert or replace the shadow copy for a message's local id.
pub async fn upsert(db: &Database, user_key: &str, message: &Message) -> Result<(), ParleyError> {
    let user_key = user_key.to_string();
    let local_id = message.local_id;
    let body = serde_json::to_string(message).map_err(|e| ParleyError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO not_sent_messages (local_id, user_key, body)
                 VALUES (?1, ?2, ?3)",
                params![local_id, user_key, body],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove the shadow copy for a local id, if present.
pub async fn remove(db: &Database, user_key: &str, local_id: i64) -> Result<(), ParleyError> {
    let user_key = user_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM not_sent_messages WHERE local_id = ?1 AND user_key = ?2",
                params![local_id, user_key],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All shadow copies for the identity, oldest first.
pub async fn all(db: &Database, user_key: &str) -> Result<Vec<Message>, ParleyError> {
    let user_key = user_key.to_string();
    let bodies: Vec<String> = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT body FROM not_sent_messages
                 WHERE user_key = ?1 ORDER BY created_at ASC, local_id DESC",
            )?;
            let rows = stmt.query_map(params![user_key], |row| row.get(0))?;
            let mut bodies = Vec::new();
            for row in rows {
                bodies.push(row?);
            }
            Ok(bodies)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    bodies
        .iter()
        .map(|body| {
            serde_json::from_str(body).map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{Direction, Payload, SendStatus};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).await.unwrap();
        (db, dir)
    }

    fn client_message(local_id: i64, text: &str) -> Message {
        Message {
            id: local_id,
            local_id,
            created_at: chrono::Utc::now(),
            direction: Direction::Client,
            payload: Payload::text(text.to_string(), text.to_string()),
            status: Some(SendStatus::Sending),
            agent: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_row_with_same_local_id() {
        let (db, _dir) = setup_db().await;

        let first = client_message(-1, "hello");
        upsert(&db, "a@x||", &first).await.unwrap();

        let failed = first.with_status(SendStatus::SendFailed);
        upsert(&db, "a@x||", &failed).await.unwrap();

        let all = all(&db, "a@x||").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, Some(SendStatus::SendFailed));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rows_are_scoped_by_identity() {
        let (db, _dir) = setup_db().await;

        upsert(&db, "a@x||", &client_message(-1, "from a")).await.unwrap();
        upsert(&db, "b@x||", &client_message(-1, "from b")).await.unwrap();

        let a = all(&db, "a@x||").await.unwrap();
        assert_eq!(a.len(), 1);
        assert!(matches!(&a[0].payload, Payload::Text { text, .. } if text == "from a"));

        remove(&db, "a@x||", -1).await.unwrap();
        assert!(all(&db, "a@x||").await.unwrap().is_empty());
        assert_eq!(all(&db, "b@x||").await.unwrap().len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_of_unknown_id_is_noop() {
        let (db, _dir) = setup_db().await;
        remove(&db, "a@x||", -99).await.unwrap();
        db.close().await.unwrap();
    }
}
