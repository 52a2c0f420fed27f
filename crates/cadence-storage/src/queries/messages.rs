// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.
//!
//! The log is append-only: rows are inserted at intake (inbound) or at
//! successful dispatch (outbound) and never mutated. Per-contact timestamp
//! order is the conversation order the draft generator sees.

use cadence_core::CadenceError;
use cadence_core::types::{ContactKey, Direction, Message};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::contacts::parse_text_col;

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let direction: String = row.get(2)?;
    Ok(Message {
        id: row.get(0)?,
        contact_key: ContactKey(row.get(1)?),
        direction: parse_text_col(2, &direction)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Append a message to the log.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), CadenceError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, contact_key, direction, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.contact_key.0,
                    msg.direction.to_string(),
                    msg.body,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All messages for a contact in chronological order.
pub async fn get_messages_for_contact(
    db: &Database,
    key: &ContactKey,
) -> Result<Vec<Message>, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, contact_key, direction, body, created_at
                 FROM messages WHERE contact_key = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![key], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recent messages for a contact, in chronological order.
///
/// This is the context window handed to the draft generator.
pub async fn get_recent_messages(
    db: &Database,
    key: &ContactKey,
    limit: i64,
) -> Result<Vec<Message>, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, contact_key, direction, body, created_at
                 FROM messages WHERE contact_key = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![key, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            // Fetched newest-first; the generator contract is oldest-first.
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether an inbound message with exactly this body exists for the contact.
///
/// Used by the reconciler to detect review items whose triggering turn was
/// never durably recorded.
pub async fn has_inbound_with_body(
    db: &Database,
    key: &ContactKey,
    body: &str,
) -> Result<bool, CadenceError> {
    let key = key.0.clone();
    let body = body.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE contact_key = ?1 AND direction = 'inbound' AND body = ?2",
                params![key, body],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of messages for a contact in the given direction.
///
/// An outbound count of zero marks a first-time contact for the auto-mode
/// gate's safety rail.
pub async fn count_by_direction(
    db: &Database,
    key: &ContactKey,
    direction: Direction,
) -> Result<i64, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE contact_key = ?1 AND direction = ?2",
                params![key, direction.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
