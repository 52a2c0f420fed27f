// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact store operations.
//!
//! Contacts are created on first inbound message or external enrollment and
//! are archived rather than deleted. State-machine advances go through the
//! conditional [`advance_state`] so concurrent processes cannot clobber each
//! other's transitions.

use cadence_core::CadenceError;
use cadence_core::types::{AdScriptState, Contact, ContactKey, RelationshipStage};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

pub(crate) fn parse_text_col<T>(idx: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("{e}").into(),
        )
    })
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    let stage: String = row.get(1)?;
    let ad_state: String = row.get(2)?;
    Ok(Contact {
        key: ContactKey(row.get(0)?),
        relationship_stage: parse_text_col(1, &stage)?,
        ad_script_state: parse_text_col(2, &ad_state)?,
        is_in_ad_flow: row.get(3)?,
        profile_notes: row.get(4)?,
        archived: row.get(5)?,
        last_interaction_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const CONTACT_COLUMNS: &str = "key, relationship_stage, ad_script_state, is_in_ad_flow,
     profile_notes, archived, last_interaction_at, created_at, updated_at";

/// Insert the contact if it does not exist yet, then return its record.
///
/// This is the intake path: the first inbound message from an unknown handle
/// creates a `new_lead` contact with default state.
pub async fn ensure_contact(db: &Database, key: &ContactKey) -> Result<Contact, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (key) VALUES (?1) ON CONFLICT(key) DO NOTHING",
                params![key],
            )?;
            conn.query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE key = ?1"),
                params![key],
                row_to_contact,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a contact by key.
pub async fn get_contact(db: &Database, key: &ContactKey) -> Result<Option<Contact>, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE key = ?1"),
                params![key],
                row_to_contact,
            );
            match result {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Conditionally advance a contact's state machine.
///
/// The update only applies while the contact is still in the expected
/// `from` state, making the advance safe under concurrent processes.
/// Returns `false` if another process transitioned the contact first.
/// Retrying with the same target state is an idempotent no-op.
pub async fn advance_state(
    db: &Database,
    key: &ContactKey,
    from_stage: RelationshipStage,
    from_ad_state: AdScriptState,
    to_stage: RelationshipStage,
    to_ad_state: AdScriptState,
    in_ad_flow: bool,
) -> Result<bool, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE contacts SET relationship_stage = ?1, ad_script_state = ?2,
                 is_in_ad_flow = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE key = ?4 AND relationship_stage = ?5 AND ad_script_state = ?6",
                params![
                    to_stage.to_string(),
                    to_ad_state.to_string(),
                    in_ad_flow,
                    key,
                    from_stage.to_string(),
                    from_ad_state.to_string(),
                ],
            )?;
            Ok(affected == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Enroll a contact in the ad flow at the given step.
pub async fn enroll_in_ad_flow(
    db: &Database,
    key: &ContactKey,
    step: AdScriptState,
) -> Result<(), CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET ad_script_state = ?1, is_in_ad_flow = 1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE key = ?2",
                params![step.to_string(), key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record the time of the contact's most recent interaction.
pub async fn touch_last_interaction(
    db: &Database,
    key: &ContactKey,
    ts: &str,
) -> Result<(), CadenceError> {
    let key = key.0.clone();
    let ts = ts.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET last_interaction_at = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE key = ?2",
                params![ts, key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Archive a contact. Contacts are never deleted.
pub async fn archive_contact(db: &Database, key: &ContactKey) -> Result<(), CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET archived = 1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE key = ?1",
                params![key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of non-archived contacts.
pub async fn count_contacts(db: &Database) -> Result<i64, CadenceError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM contacts WHERE archived = 0",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
