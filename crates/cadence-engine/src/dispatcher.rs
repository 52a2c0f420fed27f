// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatcher: performs the actual send and finalizes state atomically.
//!
//! Safe under concurrent execution by multiple processes: the conditional
//! claim (`scheduled -> sent`) is the linearization point. Zero affected
//! rows means another process won the race and this call is a no-op
//! success. A platform failure rolls the claim back to `scheduled` so the
//! next poll retries, bounded by the row's `max_attempts`.

use std::sync::Arc;

use cadence_core::time::now_iso;
use cadence_core::types::{Direction, DispatchResult, Message, ReviewStatus, ScheduledSend};
use cadence_core::{CadenceError, MessagingPlatform};
use cadence_storage::Database;
use cadence_storage::queries::{contacts, messages, reviews, schedules};
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct Dispatcher {
    db: Database,
    platform: Arc<dyn MessagingPlatform>,
}

impl Dispatcher {
    pub fn new(db: Database, platform: Arc<dyn MessagingPlatform>) -> Self {
        Self { db, platform }
    }

    /// Deliver one due send.
    ///
    /// Before claiming, the send is re-evaluated: if the contact replied
    /// after it was created, delivering the stale draft would be wrong, so
    /// the send is cancelled with an audit note and the owning review item
    /// marked skipped (the reply itself arrives as a fresh turn through
    /// intake).
    pub async fn dispatch(&self, send: &ScheduledSend) -> Result<DispatchResult, CadenceError> {
        let replied = match self
            .platform
            .contact_replied_since(&send.contact_key, &send.created_at)
            .await
        {
            Ok(replied) => replied,
            Err(e) => {
                // The reply check is advisory; a platform hiccup here must
                // not block delivery.
                warn!(schedule_id = %send.id, error = %e, "replied-since check failed; proceeding");
                false
            }
        };
        if replied {
            if schedules::cancel(
                &self.db,
                &send.id,
                "contact replied before delivery; turn re-evaluated",
            )
            .await?
            {
                reviews::cas_status(
                    &self.db,
                    &send.review_id,
                    ReviewStatus::AutoScheduled,
                    ReviewStatus::Skipped,
                    Some("contact replied before scheduled delivery"),
                )
                .await?;
                info!(schedule_id = %send.id, contact = %send.contact_key,
                      "send skipped: contact replied first");
                return Ok(DispatchResult::Skipped {
                    reason: "contact replied before delivery".to_string(),
                });
            }
            return Ok(DispatchResult::AlreadyClaimed);
        }

        // Linearization point: exactly one process gets `true` here.
        if !schedules::claim(&self.db, &send.id).await? {
            return Ok(DispatchResult::AlreadyClaimed);
        }

        match self
            .platform
            .send_message(&send.contact_key, &send.send_text)
            .await
        {
            Ok(delivery_id) => {
                let now = now_iso();
                messages::insert_message(
                    &self.db,
                    &Message {
                        id: format!("msg-{}", Uuid::new_v4()),
                        contact_key: send.contact_key.clone(),
                        direction: Direction::Outbound,
                        body: send.send_text.clone(),
                        created_at: now.clone(),
                    },
                )
                .await?;
                reviews::cas_status(
                    &self.db,
                    &send.review_id,
                    ReviewStatus::AutoScheduled,
                    ReviewStatus::Sent,
                    None,
                )
                .await?;
                contacts::touch_last_interaction(&self.db, &send.contact_key, &now).await?;
                info!(schedule_id = %send.id, contact = %send.contact_key, %delivery_id,
                      "message dispatched");
                Ok(DispatchResult::Sent { delivery_id })
            }
            Err(e) => {
                // Roll the claim back so the next poll cycle can retry.
                schedules::release_to_scheduled(&self.db, &send.id).await?;
                let attempts = send.attempts + 1;
                if attempts >= send.max_attempts {
                    let note = format!("delivery failed after {attempts} attempts: {e}");
                    schedules::cancel(&self.db, &send.id, &note).await?;
                    reviews::cas_status(
                        &self.db,
                        &send.review_id,
                        ReviewStatus::AutoScheduled,
                        ReviewStatus::Skipped,
                        Some(&note),
                    )
                    .await?;
                    error!(schedule_id = %send.id, contact = %send.contact_key, attempts,
                           error = %e, "delivery retries exhausted; send cancelled");
                } else {
                    warn!(schedule_id = %send.id, attempts, error = %e,
                          "delivery failed; will retry on next poll");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::time::plus_minutes;
    use cadence_core::types::{ContactKey, ReviewItem, ScheduleStatus};
    use cadence_test_utils::MockPlatform;
    use chrono::Utc;
    use tempfile::tempdir;

    async fn setup() -> (Database, ContactKey, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let key = ContactKey("jane_doe".into());
        contacts::ensure_contact(&db, &key).await.unwrap();
        let review = ReviewItem {
            id: "r1".into(),
            contact_key: key.clone(),
            triggering_message: "hi".into(),
            draft_text: "Hey! How's it going?".into(),
            status: ReviewStatus::AutoScheduled,
            reason: None,
            regeneration_count: 0,
            created_at: now_iso(),
            decided_at: None,
        };
        reviews::insert_review(&db, &review).await.unwrap();
        (db, key, dir)
    }

    fn make_send(id: &str, key: &ContactKey, max_attempts: i64) -> ScheduledSend {
        ScheduledSend {
            id: id.into(),
            review_id: "r1".into(),
            contact_key: key.clone(),
            send_text: "Hey! How's it going?".into(),
            delay_minutes: 0,
            scheduled_at: plus_minutes(Utc::now(), -1),
            status: ScheduleStatus::Scheduled,
            attempts: 0,
            max_attempts,
            audit_note: None,
            created_at: now_iso(),
            updated_at: now_iso(),
        }
    }

    #[tokio::test]
    async fn successful_dispatch_finalizes_everything() {
        let (db, key, _dir) = setup().await;
        let platform = Arc::new(MockPlatform::new());
        let dispatcher = Dispatcher::new(db.clone(), platform.clone());

        let send = make_send("s1", &key, 3);
        schedules::insert_schedule(&db, &send).await.unwrap();

        let result = dispatcher.dispatch(&send).await.unwrap();
        assert!(matches!(result, DispatchResult::Sent { .. }));

        // Outbound message appended, review sent, schedule terminal.
        let sent = platform.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "Hey! How's it going?");

        let log = messages::get_messages_for_contact(&db, &key).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].direction, Direction::Outbound);

        let review = reviews::get_review(&db, "r1").await.unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Sent);

        let contact = contacts::get_contact(&db, &key).await.unwrap().unwrap();
        assert!(contact.last_interaction_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_dispatch_sends_exactly_once() {
        let (db, key, _dir) = setup().await;
        let platform = Arc::new(MockPlatform::new());
        let dispatcher = Arc::new(Dispatcher::new(db.clone(), platform.clone()));

        let send = make_send("s1", &key, 3);
        schedules::insert_schedule(&db, &send).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let dispatcher = dispatcher.clone();
            let send = send.clone();
            handles.push(tokio::spawn(async move { dispatcher.dispatch(&send).await }));
        }

        let mut sent = 0;
        let mut noop = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                DispatchResult::Sent { .. } => sent += 1,
                DispatchResult::AlreadyClaimed => noop += 1,
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(sent, 1);
        assert_eq!(noop, 5);

        assert_eq!(platform.sent_messages().await.len(), 1);
        assert_eq!(
            messages::get_messages_for_contact(&db, &key).await.unwrap().len(),
            1
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delivery_failure_rolls_back_for_retry() {
        let (db, key, _dir) = setup().await;
        let platform = Arc::new(MockPlatform::new());
        platform.fail_next_sends(1).await;
        let dispatcher = Dispatcher::new(db.clone(), platform.clone());

        let send = make_send("s1", &key, 3);
        schedules::insert_schedule(&db, &send).await.unwrap();

        let err = dispatcher.dispatch(&send).await.unwrap_err();
        assert!(matches!(err, CadenceError::Delivery { .. }));

        // Back to scheduled with one attempt burned; eligible for next poll.
        let row = schedules::get_schedule(&db, "s1").await.unwrap().unwrap();
        assert_eq!(row.status, ScheduleStatus::Scheduled);
        assert_eq!(row.attempts, 1);
        assert!(messages::get_messages_for_contact(&db, &key).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn exhausted_retries_cancel_and_surface() {
        let (db, key, _dir) = setup().await;
        let platform = Arc::new(MockPlatform::new());
        platform.fail_next_sends(10).await;
        let dispatcher = Dispatcher::new(db.clone(), platform.clone());

        let mut send = make_send("s1", &key, 2);
        schedules::insert_schedule(&db, &send).await.unwrap();

        // First failure: retryable.
        assert!(dispatcher.dispatch(&send).await.is_err());
        send.attempts = 1;
        // Second failure hits max_attempts: cancelled and surfaced.
        assert!(dispatcher.dispatch(&send).await.is_err());

        let row = schedules::get_schedule(&db, "s1").await.unwrap().unwrap();
        assert_eq!(row.status, ScheduleStatus::Cancelled);
        assert!(row.audit_note.unwrap().contains("delivery failed after 2 attempts"));

        let review = reviews::get_review(&db, "r1").await.unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Skipped);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reply_after_scheduling_skips_the_send() {
        let (db, key, _dir) = setup().await;
        let platform = Arc::new(MockPlatform::new());
        platform.set_replied(&key, true).await;
        let dispatcher = Dispatcher::new(db.clone(), platform.clone());

        let send = make_send("s1", &key, 3);
        schedules::insert_schedule(&db, &send).await.unwrap();

        let result = dispatcher.dispatch(&send).await.unwrap();
        assert!(matches!(result, DispatchResult::Skipped { .. }));

        // Nothing delivered; audit trail explains why.
        assert!(platform.sent_messages().await.is_empty());
        let row = schedules::get_schedule(&db, "s1").await.unwrap().unwrap();
        assert_eq!(row.status, ScheduleStatus::Cancelled);
        assert!(row.audit_note.unwrap().contains("replied"));

        let review = reviews::get_review(&db, "r1").await.unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Skipped);

        db.close().await.unwrap();
    }
}
