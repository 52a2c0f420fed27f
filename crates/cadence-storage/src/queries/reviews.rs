// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review queue operations.
//!
//! Status changes that matter for correctness go through [`cas_status`] or
//! [`supersede_open`]: single conditional UPDATEs (or a transaction on the
//! single writer thread) so concurrent processes observe a lost race as zero
//! affected rows, never as a double transition.

use cadence_core::CadenceError;
use cadence_core::types::{ContactKey, ReviewItem, ReviewStatus};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::contacts::parse_text_col;

const REVIEW_COLUMNS: &str = "id, contact_key, triggering_message, draft_text, status,
     reason, regeneration_count, created_at, decided_at";

fn row_to_review(row: &rusqlite::Row<'_>) -> Result<ReviewItem, rusqlite::Error> {
    let status: String = row.get(4)?;
    Ok(ReviewItem {
        id: row.get(0)?,
        contact_key: ContactKey(row.get(1)?),
        triggering_message: row.get(2)?,
        draft_text: row.get(3)?,
        status: parse_text_col(4, &status)?,
        reason: row.get(5)?,
        regeneration_count: row.get(6)?,
        created_at: row.get(7)?,
        decided_at: row.get(8)?,
    })
}

/// Insert a new review item.
pub async fn insert_review(db: &Database, item: &ReviewItem) -> Result<(), CadenceError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO review_items
                 (id, contact_key, triggering_message, draft_text, status, reason,
                  regeneration_count, created_at, decided_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    item.id,
                    item.contact_key.0,
                    item.triggering_message,
                    item.draft_text,
                    item.status.to_string(),
                    item.reason,
                    item.regeneration_count,
                    item.created_at,
                    item.decided_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a review item by id.
pub async fn get_review(db: &Database, id: &str) -> Result<Option<ReviewItem>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM review_items WHERE id = ?1"),
                params![id],
                row_to_review,
            );
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All items awaiting a human decision, oldest first.
pub async fn list_pending(db: &Database) -> Result<Vec<ReviewItem>, CadenceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM review_items
                 WHERE status = 'pending_review'
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_review)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(map_tr_err)
}

/// All non-terminal items, oldest first. Reconciler input.
pub async fn list_open(db: &Database) -> Result<Vec<ReviewItem>, CadenceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM review_items
                 WHERE status IN ('pending_review', 'auto_scheduled')
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_review)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(map_tr_err)
}

/// Non-terminal items for one contact, newest first.
pub async fn open_for_contact(
    db: &Database,
    key: &ContactKey,
) -> Result<Vec<ReviewItem>, CadenceError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM review_items
                 WHERE contact_key = ?1 AND status IN ('pending_review', 'auto_scheduled')
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![key], row_to_review)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(map_tr_err)
}

/// Contacts holding more than one non-terminal item.
///
/// This set should always be empty; the reconciler collapses violations.
pub async fn contacts_with_multiple_open(db: &Database) -> Result<Vec<ContactKey>, CadenceError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT contact_key FROM review_items
                 WHERE status IN ('pending_review', 'auto_scheduled')
                 GROUP BY contact_key HAVING COUNT(*) > 1",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(ContactKey(row?));
            }
            Ok(keys)
        })
        .await
        .map_err(map_tr_err)
}

/// Conditionally transition a review item's status.
///
/// The update applies only while the item still has status `from`; a lost
/// race returns `false`. `decided_at` is stamped when `to` is terminal.
pub async fn cas_status(
    db: &Database,
    id: &str,
    from: ReviewStatus,
    to: ReviewStatus,
    reason: Option<&str>,
) -> Result<bool, CadenceError> {
    let id = id.to_string();
    let reason = reason.map(|r| r.to_string());
    let stamp_decision = to.is_terminal();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE review_items SET status = ?1,
                 reason = COALESCE(?2, reason),
                 decided_at = CASE WHEN ?3 THEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                                   ELSE decided_at END
                 WHERE id = ?4 AND status = ?5",
                params![to.to_string(), reason, stamp_decision, id, from.to_string()],
            )?;
            Ok(affected == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Reject every non-terminal item for a contact, returning the ids touched.
///
/// Runs as one transaction on the single writer thread, so a concurrent
/// insert cannot interleave between the select and the updates. The caller
/// then creates the fresh item for the newer turn and cancels any pending
/// sends owned by the returned ids.
pub async fn supersede_open(
    db: &Database,
    key: &ContactKey,
    reason: &str,
) -> Result<Vec<String>, CadenceError> {
    let key = key.0.clone();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM review_items
                     WHERE contact_key = ?1 AND status IN ('pending_review', 'auto_scheduled')
                     ORDER BY created_at ASC",
                )?;
                let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };
            for id in &ids {
                tx.execute(
                    "UPDATE review_items SET status = 'rejected', reason = ?1,
                     decided_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![reason, id],
                )?;
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the draft on a still-pending item and bump its regeneration
/// count. Returns `false` if the item left `pending_review` in the meantime.
pub async fn update_draft(db: &Database, id: &str, draft: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    let draft = draft.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE review_items SET draft_text = ?1,
                 regeneration_count = regeneration_count + 1,
                 reason = NULL
                 WHERE id = ?2 AND status = 'pending_review'",
                params![draft, id],
            )?;
            Ok(affected == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of items with the given status.
pub async fn count_by_status(db: &Database, status: ReviewStatus) -> Result<i64, CadenceError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM review_items WHERE status = ?1",
                params![status.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::contacts::ensure_contact;
    use cadence_core::time::now_iso;
    use tempfile::tempdir;

    async fn setup_db_with_contact(key: &str) -> (Database, ContactKey, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let contact = ContactKey(key.to_string());
        ensure_contact(&db, &contact).await.unwrap();
        (db, contact, dir)
    }

    fn make_item(id: &str, key: &ContactKey, trigger: &str) -> ReviewItem {
        ReviewItem {
            id: id.to_string(),
            contact_key: key.clone(),
            triggering_message: trigger.to_string(),
            draft_text: "draft".to_string(),
            status: ReviewStatus::PendingReview,
            reason: None,
            regeneration_count: 0,
            created_at: now_iso(),
            decided_at: None,
        }
    }

    #[tokio::test]
    async fn insert_and_list_pending() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;

        insert_review(&db, &make_item("r1", &key, "hi")).await.unwrap();
        let pending = list_pending(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "r1");
        assert_eq!(pending[0].status, ReviewStatus::PendingReview);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cas_status_wins_once_and_loses_after() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        insert_review(&db, &make_item("r1", &key, "hi")).await.unwrap();

        let first = cas_status(
            &db,
            "r1",
            ReviewStatus::PendingReview,
            ReviewStatus::AutoScheduled,
            None,
        )
        .await
        .unwrap();
        assert!(first);

        // The item is no longer pending; the same transition loses.
        let second = cas_status(
            &db,
            "r1",
            ReviewStatus::PendingReview,
            ReviewStatus::AutoScheduled,
            None,
        )
        .await
        .unwrap();
        assert!(!second);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn terminal_transition_stamps_decided_at() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        insert_review(&db, &make_item("r1", &key, "hi")).await.unwrap();

        cas_status(
            &db,
            "r1",
            ReviewStatus::PendingReview,
            ReviewStatus::Rejected,
            Some("not appropriate"),
        )
        .await
        .unwrap();

        let item = get_review(&db, "r1").await.unwrap().unwrap();
        assert_eq!(item.status, ReviewStatus::Rejected);
        assert_eq!(item.reason.as_deref(), Some("not appropriate"));
        assert!(item.decided_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn supersede_rejects_all_open_items() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        insert_review(&db, &make_item("r1", &key, "hi")).await.unwrap();
        let mut scheduled = make_item("r2", &key, "hello?");
        scheduled.status = ReviewStatus::AutoScheduled;
        insert_review(&db, &scheduled).await.unwrap();

        let ids = supersede_open(&db, &key, "superseded by newer message")
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        for id in &ids {
            let item = get_review(&db, id).await.unwrap().unwrap();
            assert_eq!(item.status, ReviewStatus::Rejected);
            assert_eq!(item.reason.as_deref(), Some("superseded by newer message"));
        }
        assert!(open_for_contact(&db, &key).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn supersede_leaves_terminal_items_alone() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        let mut sent = make_item("r1", &key, "hi");
        sent.status = ReviewStatus::Sent;
        insert_review(&db, &sent).await.unwrap();

        let ids = supersede_open(&db, &key, "superseded by newer message")
            .await
            .unwrap();
        assert!(ids.is_empty());

        let item = get_review(&db, "r1").await.unwrap().unwrap();
        assert_eq!(item.status, ReviewStatus::Sent);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_draft_bumps_regeneration_count_in_place() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        insert_review(&db, &make_item("r1", &key, "hi")).await.unwrap();

        assert!(update_draft(&db, "r1", "better draft").await.unwrap());
        assert!(update_draft(&db, "r1", "best draft").await.unwrap());

        let item = get_review(&db, "r1").await.unwrap().unwrap();
        assert_eq!(item.draft_text, "best draft");
        assert_eq!(item.regeneration_count, 2);
        // Still the same item: regenerate never creates a second row.
        assert_eq!(open_for_contact(&db, &key).await.unwrap().len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_draft_refuses_decided_items() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        insert_review(&db, &make_item("r1", &key, "hi")).await.unwrap();
        cas_status(&db, "r1", ReviewStatus::PendingReview, ReviewStatus::Rejected, None)
            .await
            .unwrap();

        assert!(!update_draft(&db, "r1", "too late").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn multiple_open_detection() {
        let (db, key, _dir) = setup_db_with_contact("jane_doe").await;
        insert_review(&db, &make_item("r1", &key, "a")).await.unwrap();
        assert!(contacts_with_multiple_open(&db).await.unwrap().is_empty());

        insert_review(&db, &make_item("r2", &key, "b")).await.unwrap();
        let violators = contacts_with_multiple_open(&db).await.unwrap();
        assert_eq!(violators, vec![key.clone()]);

        db.close().await.unwrap();
    }
}
