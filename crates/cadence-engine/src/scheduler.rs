// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler: turns approved drafts into future sends with a randomized,
//! human-plausible delay, and polls for due rows.

use std::sync::Arc;
use std::time::Duration;

use cadence_config::SchedulerConfig;
use cadence_core::CadenceError;
use cadence_core::time::{now_iso, plus_minutes};
use cadence_core::types::{ReviewItem, ScheduleStatus, ScheduledSend};
use cadence_storage::Database;
use cadence_storage::queries::schedules;
use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;

pub struct Scheduler {
    db: Database,
    min_delay_minutes: i64,
    max_delay_minutes: i64,
    poll: Duration,
    max_attempts: i64,
}

impl Scheduler {
    pub fn new(db: Database, config: &SchedulerConfig, max_attempts: i64) -> Self {
        Self {
            db,
            min_delay_minutes: config.min_delay_minutes,
            max_delay_minutes: config.max_delay_minutes,
            poll: Duration::from_secs(config.poll_secs),
            max_attempts,
        }
    }

    /// Create a scheduled send for an approved review item.
    ///
    /// The delay is drawn uniformly from the configured inclusive range and
    /// recorded on the row for auditability; `send_text` is frozen here so
    /// later edits to the review item cannot change what goes out.
    pub async fn schedule(
        &self,
        review: &ReviewItem,
        send_text: &str,
    ) -> Result<ScheduledSend, CadenceError> {
        // ThreadRng is not Send; draw before any await.
        let delay_minutes = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.min_delay_minutes..=self.max_delay_minutes)
        };
        let now = now_iso();
        let send = ScheduledSend {
            id: format!("sched-{}", Uuid::new_v4()),
            review_id: review.id.clone(),
            contact_key: review.contact_key.clone(),
            send_text: send_text.to_string(),
            delay_minutes,
            scheduled_at: plus_minutes(Utc::now(), delay_minutes),
            status: ScheduleStatus::Scheduled,
            attempts: 0,
            max_attempts: self.max_attempts,
            audit_note: None,
            created_at: now.clone(),
            updated_at: now,
        };
        schedules::insert_schedule(&self.db, &send).await?;
        info!(schedule_id = %send.id, contact = %send.contact_key, delay_minutes,
              scheduled_at = %send.scheduled_at, "send scheduled");
        Ok(send)
    }

    /// Dispatch every send whose `scheduled_at` has passed. Per-send failures
    /// are logged and do not abort the batch; the failing row stays eligible
    /// for the next cycle until its attempts run out.
    pub async fn poll_once(&self, dispatcher: &Dispatcher) -> Result<usize, CadenceError> {
        let due = schedules::due_sends(&self.db, &now_iso()).await?;
        let mut dispatched = 0;
        for send in &due {
            match dispatcher.dispatch(send).await {
                Ok(_) => dispatched += 1,
                Err(e) => {
                    warn!(schedule_id = %send.id, error = %e, "dispatch failed");
                }
            }
        }
        if !due.is_empty() {
            debug!(due = due.len(), dispatched, "scheduler poll complete");
        }
        Ok(dispatched)
    }

    pub async fn run(self: Arc<Self>, dispatcher: Arc<Dispatcher>) {
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Err(e) = self.poll_once(&dispatcher).await {
                warn!(error = %e, "scheduler poll errored");
            }
        }
    }
}
