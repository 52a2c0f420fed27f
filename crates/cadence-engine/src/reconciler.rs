// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drift reconciler: a periodic sweep that compares the store against the
//! engine's invariants and repairs what it finds. Every repair either
//! completes the intended action or lands the rows in a terminal state with
//! an audit note; the sweep never leaves drift half-fixed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::CadenceError;
use cadence_core::time::{now_iso, plus_minutes};
use cadence_core::types::{Direction, Message, ReviewStatus};
use cadence_storage::Database;
use cadence_storage::queries::{messages, reviews, schedules};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// A send still `scheduled` well past its `scheduled_at`.
    OverdueSend,
    /// A review item whose triggering inbound message is missing from the log.
    MissingTriggeringMessage,
    /// A contact holding more than one non-terminal review item.
    MultipleOpenItems,
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriftKind::OverdueSend => "overdue_send",
            DriftKind::MissingTriggeringMessage => "missing_triggering_message",
            DriftKind::MultipleOpenItems => "multiple_open_items",
        };
        f.write_str(s)
    }
}

/// One detected-and-repaired inconsistency, for the sweep report.
#[derive(Debug, Clone)]
pub struct DriftRecord {
    pub kind: DriftKind,
    pub entity_id: String,
    pub expected: String,
    pub found: String,
}

pub struct Reconciler {
    db: Database,
    dispatcher: Arc<Dispatcher>,
    grace_minutes: i64,
}

impl Reconciler {
    pub fn new(db: Database, dispatcher: Arc<Dispatcher>, grace_minutes: i64) -> Self {
        Self {
            db,
            dispatcher,
            grace_minutes,
        }
    }

    /// Run all checks once and return what was repaired.
    pub async fn sweep(&self) -> Result<Vec<DriftRecord>, CadenceError> {
        let mut drifts = Vec::new();
        self.sweep_overdue(&mut drifts).await?;
        self.sweep_missing_messages(&mut drifts).await?;
        self.sweep_collapse_open(&mut drifts).await?;
        if drifts.is_empty() {
            info!("reconciler sweep clean");
        } else {
            for d in &drifts {
                info!(kind = %d.kind, entity = %d.entity_id, expected = %d.expected,
                      found = %d.found, "drift repaired");
            }
        }
        Ok(drifts)
    }

    /// Sends overdue past the grace period get one redispatch attempt. If
    /// that fails too, the send is cancelled outright so the row cannot sit
    /// in limbo across sweeps.
    async fn sweep_overdue(&self, drifts: &mut Vec<DriftRecord>) -> Result<(), CadenceError> {
        let cutoff = plus_minutes(Utc::now(), -self.grace_minutes);
        let overdue = schedules::due_sends(&self.db, &cutoff).await?;
        for send in overdue {
            drifts.push(DriftRecord {
                kind: DriftKind::OverdueSend,
                entity_id: send.id.clone(),
                expected: format!("dispatched near {}", send.scheduled_at),
                found: format!("still scheduled at {}", now_iso()),
            });
            if let Err(e) = self.dispatcher.dispatch(&send).await {
                warn!(schedule_id = %send.id, error = %e, "redispatch of overdue send failed");
                // dispatch() released the claim (or cancelled at the attempt
                // cap); force terminality either way.
                let note = format!("overdue beyond grace; cancelled after failed redispatch: {e}");
                schedules::cancel(&self.db, &send.id, &note).await?;
                reviews::cas_status(
                    &self.db,
                    &send.review_id,
                    ReviewStatus::AutoScheduled,
                    ReviewStatus::Skipped,
                    Some(&note),
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Every open review item must trace back to an inbound message with its
    /// triggering body. A missing one is backfilled, stamped with the item's
    /// own timestamp so log ordering stays truthful.
    async fn sweep_missing_messages(
        &self,
        drifts: &mut Vec<DriftRecord>,
    ) -> Result<(), CadenceError> {
        for item in reviews::list_open(&self.db).await? {
            let present = messages::has_inbound_with_body(
                &self.db,
                &item.contact_key,
                &item.triggering_message,
            )
            .await?;
            if present {
                continue;
            }
            messages::insert_message(
                &self.db,
                &Message {
                    id: format!("msg-{}", Uuid::new_v4()),
                    contact_key: item.contact_key.clone(),
                    direction: Direction::Inbound,
                    body: item.triggering_message.clone(),
                    created_at: item.created_at.clone(),
                },
            )
            .await?;
            drifts.push(DriftRecord {
                kind: DriftKind::MissingTriggeringMessage,
                entity_id: item.id.clone(),
                expected: "inbound message matching the triggering text".to_string(),
                found: "no such message; backfilled".to_string(),
            });
        }
        Ok(())
    }

    /// Collapse contacts with multiple open items down to the newest one.
    async fn sweep_collapse_open(&self, drifts: &mut Vec<DriftRecord>) -> Result<(), CadenceError> {
        for key in reviews::contacts_with_multiple_open(&self.db).await? {
            let open = reviews::open_for_contact(&self.db, &key).await?;
            // Newest first; everything after the head loses.
            for stale in open.iter().skip(1) {
                let from = stale.status;
                if reviews::cas_status(
                    &self.db,
                    &stale.id,
                    from,
                    ReviewStatus::Rejected,
                    Some("superseded by newer message (reconciled)"),
                )
                .await?
                {
                    schedules::cancel_for_review(
                        &self.db,
                        &stale.id,
                        "superseding review item rejected (reconciled)",
                    )
                    .await?;
                    drifts.push(DriftRecord {
                        kind: DriftKind::MultipleOpenItems,
                        entity_id: stale.id.clone(),
                        expected: format!("at most one open item for {key}"),
                        found: format!("{} open items", open.len()),
                    });
                }
            }
        }
        Ok(())
    }

    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                warn!(error = %e, "reconciler sweep errored");
            }
        }
    }
}
