// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saved form field values, flattened to a field-id -> value map.

use rusqlite::{OptionalExtension, params};

use parley_core::{ParleyError, SavedFormValues};

use crate::database::Database;

pub async fn save(
    db: &Database,
    user_key: &str,
    form_id: i64,
    values: &SavedFormValues,
) -> Result<(), ParleyError> {
    let user_key = user_key.to_string();
    let fields = serde_json::to_string(&values.values).map_err(|e| ParleyError::Storage {
        source: Box::new(e),
    })?;
    let sent = values.sent;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO form_values (form_id, user_key, fields, sent)
                 VALUES (?1, ?2, ?3, ?4)",
                params![form_id, user_key, fields, sent],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn load(
    db: &Database,
    user_key: &str,
    form_id: i64,
) -> Result<Option<SavedFormValues>, ParleyError> {
    let user_key = user_key.to_string();
    let row: Option<(String, bool)> = db
        .connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT fields, sent FROM form_values
                     WHERE form_id = ?1 AND user_key = ?2",
                    params![form_id, user_key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match row {
        Some((fields, sent)) => {
            let values = serde_json::from_str(&fields).map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })?;
            Ok(Some(SavedFormValues { values, sent }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_then_load_round_trips_and_updates() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).await.unwrap();

        assert!(load(&db, "a@x||", 7).await.unwrap().is_none());

        let mut values = HashMap::new();
        values.insert("100".to_string(), "hello".to_string());
        values.insert("101".to_string(), "true".to_string());
        save(
            &db,
            "a@x||",
            7,
            &SavedFormValues {
                values: values.clone(),
                sent: false,
            },
        )
        .await
        .unwrap();

        let loaded = load(&db, "a@x||", 7).await.unwrap().unwrap();
        assert_eq!(loaded.values, values);
        assert!(!loaded.sent);

        save(&db, "a@x||", 7, &SavedFormValues { values, sent: true })
            .await
            .unwrap();
        assert!(load(&db, "a@x||", 7).await.unwrap().unwrap().sent);

        // other forms and identities stay independent
        assert!(load(&db, "a@x||", 8).await.unwrap().is_none());
        assert!(load(&db, "b@x||", 7).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
