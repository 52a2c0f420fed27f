// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled-send operations.
//!
//! The conditional [`claim`] is the linearization point of the whole engine:
//! exactly one process can move a row `scheduled -> sent`, and everything
//! after the claim is committed. [`release_to_scheduled`] is the only sent
//! rollback and exists solely for delivery failure inside the claiming
//! process; it bumps the attempt counter so retries stay bounded.

use cadence_core::CadenceError;
use cadence_core::types::{ContactKey, ScheduleStatus, ScheduledSend};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::contacts::parse_text_col;

const SCHEDULE_COLUMNS: &str = "id, review_id, contact_key, send_text, delay_minutes,
     scheduled_at, status, attempts, max_attempts, audit_note, created_at, updated_at";

fn row_to_schedule(row: &rusqlite::Row<'_>) -> Result<ScheduledSend, rusqlite::Error> {
    let status: String = row.get(6)?;
    Ok(ScheduledSend {
        id: row.get(0)?,
        review_id: row.get(1)?,
        contact_key: ContactKey(row.get(2)?),
        send_text: row.get(3)?,
        delay_minutes: row.get(4)?,
        scheduled_at: row.get(5)?,
        status: parse_text_col(6, &status)?,
        attempts: row.get(7)?,
        max_attempts: row.get(8)?,
        audit_note: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Persist a new scheduled send.
pub async fn insert_schedule(db: &Database, send: &ScheduledSend) -> Result<(), CadenceError> {
    let send = send.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scheduled_sends
                 (id, review_id, contact_key, send_text, delay_minutes, scheduled_at,
                  status, attempts, max_attempts, audit_note, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    send.id,
                    send.review_id,
                    send.contact_key.0,
                    send.send_text,
                    send.delay_minutes,
                    send.scheduled_at,
                    send.status.to_string(),
                    send.attempts,
                    send.max_attempts,
                    send.audit_note,
                    send.created_at,
                    send.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a scheduled send by id.
pub async fn get_schedule(db: &Database, id: &str) -> Result<Option<ScheduledSend>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM scheduled_sends WHERE id = ?1"),
                params![id],
                row_to_schedule,
            );
            match result {
                Ok(send) => Ok(Some(send)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The scheduled send owned by a review item, if any.
pub async fn get_for_review(
    db: &Database,
    review_id: &str,
) -> Result<Option<ScheduledSend>, CadenceError> {
    let review_id = review_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {SCHEDULE_COLUMNS} FROM scheduled_sends
                     WHERE review_id = ?1 ORDER BY created_at DESC LIMIT 1"
                ),
                params![review_id],
                row_to_schedule,
            );
            match result {
                Ok(send) => Ok(Some(send)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Still-scheduled sends due at or before `now`, oldest first.
pub async fn due_sends(db: &Database, now: &str) -> Result<Vec<ScheduledSend>, CadenceError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM scheduled_sends
                 WHERE status = 'scheduled' AND scheduled_at <= ?1
                 ORDER BY scheduled_at ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_schedule)?;
            let mut sends = Vec::new();
            for row in rows {
                sends.push(row?);
            }
            Ok(sends)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim a send for dispatch (`scheduled -> sent`).
///
/// Returns `false` when another process has already claimed or cancelled the
/// row; the caller must then do nothing.
pub async fn claim(db: &Database, id: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE scheduled_sends SET status = 'sent',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'scheduled'",
                params![id],
            )?;
            Ok(affected == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Roll a failed delivery back to `scheduled` and count the attempt.
///
/// Only valid from the process that just claimed the row.
pub async fn release_to_scheduled(db: &Database, id: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE scheduled_sends SET status = 'scheduled',
                 attempts = attempts + 1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'sent'",
                params![id],
            )?;
            Ok(affected == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Cancel a still-scheduled send, recording why.
pub async fn cancel(db: &Database, id: &str, note: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    let note = note.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE scheduled_sends SET status = 'cancelled', audit_note = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'scheduled'",
                params![note, id],
            )?;
            Ok(affected == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Cancel any still-scheduled sends owned by a review item. Returns how many
/// rows were cancelled.
pub async fn cancel_for_review(
    db: &Database,
    review_id: &str,
    note: &str,
) -> Result<usize, CadenceError> {
    let review_id = review_id.to_string();
    let note = note.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE scheduled_sends SET status = 'cancelled', audit_note = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE review_id = ?2 AND status = 'scheduled'",
                params![note, review_id],
            )?;
            Ok(affected)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of sends with the given status.
pub async fn count_by_status(db: &Database, status: ScheduleStatus) -> Result<i64, CadenceError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM scheduled_sends WHERE status = ?1",
                params![status.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
