// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted chat configurations, keyed by client identity.
//!
//! The stored configuration carries the client token issued by the
//! server, so a returning client with the same identity resumes the
//! same chat.

use rusqlite::{OptionalExtension, params};

use parley_core::{ChatConfig, ParleyError};

use crate::database::Database;

pub async fn set(db: &Database, user_key: &str, config: &ChatConfig) -> Result<(), ParleyError> {
    let user_key = user_key.to_string();
    let body = serde_json::to_string(config).map_err(|e| ParleyError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO configurations (user_key, body) VALUES (?1, ?2)",
                params![user_key, body],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get(db: &Database, user_key: &str) -> Result<Option<ChatConfig>, ParleyError> {
    let user_key = user_key.to_string();
    let body: Option<String> = db
        .connection()
        .call(move |conn| {
            let body = conn
                .query_row(
                    "SELECT body FROM configurations WHERE user_key = ?1",
                    params![user_key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(body)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match body {
        Some(body) => serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn token_persists_for_returning_identity() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).await.unwrap();

        let mut config = ChatConfig::new("153", "17", "wss://chat.example", "https://api.example");
        config.client_email = Some("a@x".to_string());
        config.client_token = Some("token-1".to_string());

        let key = config.user_key();
        set(&db, &key, &config).await.unwrap();

        let loaded = get(&db, &key).await.unwrap().unwrap();
        assert_eq!(loaded.client_token.as_deref(), Some("token-1"));

        assert!(get(&db, "other||").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
