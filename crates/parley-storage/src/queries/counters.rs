// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named monotonic counters.
//!
//! Local message ids count downward from zero so they can never collide
//! with server-assigned ids, which are positive.

use rusqlite::params;

use parley_core::ParleyError;

use crate::database::Database;

pub const LOCAL_ID_COUNTER: &str = "local_message_id";

/// Decrements the named counter and returns the new value.
///
/// The first call on a fresh database returns -1. Decrement and read
/// happen in one transaction so concurrent callers never see the same id.
pub async fn next_down(db: &Database, name: &str) -> Result<i64, ParleyError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO counters (name, value) VALUES (?1, 0)
                 ON CONFLICT(name) DO NOTHING",
                params![name],
            )?;
            tx.execute(
                "UPDATE counters SET value = value - 1 WHERE name = ?1",
                params![name],
            )?;
            let value: i64 = tx.query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
