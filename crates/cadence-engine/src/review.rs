// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review queue: the pipeline that turns a coalesced inbound turn into a
//! reviewed (or auto-approved) draft, plus the human surface for acting on
//! pending items.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::time::now_iso;
use cadence_core::types::{
    Contact, ContactContext, ContactKey, Direction, GateDecision, Message, ReviewItem,
    ReviewStatus, ScenarioConfig, ScheduledSend,
};
use cadence_core::{CadenceError, DraftGenerator};
use cadence_storage::Database;
use cadence_storage::queries::{contacts, messages, reviews, schedules};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gate::{self, ToggleStore};
use crate::intake::Turn;
use crate::scheduler::Scheduler;
use crate::state_machine::{self, TransitionTable};

/// How much conversation history the generator sees.
const CONTEXT_MESSAGES: i64 = 20;

const RETRY_BASE: Duration = Duration::from_millis(250);

pub struct ReviewQueue {
    db: Database,
    generator: Arc<dyn DraftGenerator>,
    scenario: ScenarioConfig,
    table: TransitionTable,
    toggles: Arc<ToggleStore>,
    scheduler: Arc<Scheduler>,
    max_retries: u32,
}

impl ReviewQueue {
    pub fn new(
        db: Database,
        generator: Arc<dyn DraftGenerator>,
        scenario: &ScenarioConfig,
        toggles: Arc<ToggleStore>,
        scheduler: Arc<Scheduler>,
        max_retries: u32,
    ) -> Result<Self, CadenceError> {
        Ok(Self {
            db,
            generator,
            scenario: scenario.clone(),
            table: TransitionTable::from_scenario(scenario)?,
            toggles,
            scheduler,
            max_retries,
        })
    }

    /// Process one coalesced turn end to end.
    ///
    /// Logs the turn, advances ad-script state, supersedes any open items
    /// for the contact, drafts a reply and routes it through the auto-mode
    /// gate. Always leaves exactly one non-terminal item for the contact,
    /// even when generation fails (the failure surfaces as a pending item
    /// with an empty draft and a reason).
    pub async fn handle_turn(&self, turn: &Turn) -> Result<ReviewItem, CadenceError> {
        let contact = contacts::ensure_contact(&self.db, &turn.contact_key).await?;

        messages::insert_message(
            &self.db,
            &Message {
                id: format!("msg-{}", Uuid::new_v4()),
                contact_key: turn.contact_key.clone(),
                direction: Direction::Inbound,
                body: turn.text.clone(),
                created_at: turn.received_at.clone(),
            },
        )
        .await?;
        contacts::touch_last_interaction(&self.db, &turn.contact_key, &now_iso()).await?;

        let contact =
            state_machine::apply_ad_trigger(&self.db, &self.table, &contact, &turn.text).await?;

        let superseded = reviews::supersede_open(
            &self.db,
            &turn.contact_key,
            "superseded by newer message",
        )
        .await?;
        for id in &superseded {
            schedules::cancel_for_review(&self.db, id, "superseding review item rejected").await?;
        }
        if !superseded.is_empty() {
            info!(contact = %turn.contact_key, count = superseded.len(),
                  "open review items superseded by fresh turn");
        }

        // First contact = the system has never messaged this person.
        let is_first_contact =
            messages::count_by_direction(&self.db, &turn.contact_key, Direction::Outbound).await?
                == 0;

        let context = ContactContext {
            contact: contact.clone(),
            recent_messages: messages::get_recent_messages(
                &self.db,
                &turn.contact_key,
                CONTEXT_MESSAGES,
            )
            .await?,
        };

        let item = match self.generate_with_retry(&context, &turn.text).await {
            Ok(draft) => self.new_item(&turn.contact_key, &turn.text, &draft, None),
            Err(e) => {
                warn!(contact = %turn.contact_key, error = %e,
                      "draft generation failed; queueing for manual handling");
                self.new_item(
                    &turn.contact_key,
                    &turn.text,
                    "",
                    Some(format!("draft generation failed: {e}")),
                )
            }
        };
        reviews::insert_review(&self.db, &item).await?;

        // Generation failures always need a human, whatever the toggles say.
        if item.reason.is_some() {
            return Ok(item);
        }

        let category = gate::categorize(&contact);
        let decision = gate::decide(category, is_first_contact, &self.toggles.snapshot());
        debug!(contact = %turn.contact_key, %category, ?decision, is_first_contact,
               "auto-mode gate evaluated");
        match decision {
            GateDecision::RequireHuman => Ok(item),
            GateDecision::AutoApprove => {
                if reviews::cas_status(
                    &self.db,
                    &item.id,
                    ReviewStatus::PendingReview,
                    ReviewStatus::AutoScheduled,
                    None,
                )
                .await?
                {
                    self.scheduler.schedule(&item, &item.draft_text).await?;
                }
                Ok(reviews::get_review(&self.db, &item.id)
                    .await?
                    .unwrap_or(item))
            }
        }
    }

    /// Approve a pending item, optionally with an edited text, and hand it
    /// to the scheduler. `Ok(None)` means the item was no longer pending
    /// (already decided or superseded); nothing is scheduled then.
    pub async fn approve(
        &self,
        id: &str,
        final_text: Option<&str>,
    ) -> Result<Option<ScheduledSend>, CadenceError> {
        let Some(item) = reviews::get_review(&self.db, id).await? else {
            return Err(CadenceError::Internal(format!("unknown review item {id}")));
        };
        if !reviews::cas_status(
            &self.db,
            id,
            ReviewStatus::PendingReview,
            ReviewStatus::AutoScheduled,
            None,
        )
        .await?
        {
            return Ok(None);
        }
        let text = final_text.unwrap_or(&item.draft_text);
        let send = self.scheduler.schedule(&item, text).await?;
        info!(review_id = %id, contact = %item.contact_key, schedule_id = %send.id,
              "review item approved");
        Ok(Some(send))
    }

    /// Reject an open item and cancel any pending send it owns. Safe to call
    /// on an already-decided item; that is a `false` no-op.
    pub async fn reject(&self, id: &str, reason: &str) -> Result<bool, CadenceError> {
        let rejected = reviews::cas_status(
            &self.db,
            id,
            ReviewStatus::PendingReview,
            ReviewStatus::Rejected,
            Some(reason),
        )
        .await?
            || reviews::cas_status(
                &self.db,
                id,
                ReviewStatus::AutoScheduled,
                ReviewStatus::Rejected,
                Some(reason),
            )
            .await?;
        if rejected {
            let cancelled =
                schedules::cancel_for_review(&self.db, id, "review item rejected").await?;
            info!(review_id = %id, cancelled_sends = cancelled, "review item rejected");
        }
        Ok(rejected)
    }

    /// Produce a fresh draft for a still-pending item. `Ok(None)` if the
    /// item is no longer pending.
    pub async fn regenerate(&self, id: &str) -> Result<Option<ReviewItem>, CadenceError> {
        let Some(item) = reviews::get_review(&self.db, id).await? else {
            return Err(CadenceError::Internal(format!("unknown review item {id}")));
        };
        if item.status != ReviewStatus::PendingReview {
            return Ok(None);
        }
        let Some(contact) = contacts::get_contact(&self.db, &item.contact_key).await? else {
            return Err(CadenceError::Internal(format!(
                "review item {id} references missing contact {}",
                item.contact_key
            )));
        };
        let context = ContactContext {
            contact,
            recent_messages: messages::get_recent_messages(
                &self.db,
                &item.contact_key,
                CONTEXT_MESSAGES,
            )
            .await?,
        };
        let draft = self
            .generate_with_retry(&context, &item.triggering_message)
            .await?;
        if !reviews::update_draft(&self.db, id, &draft).await? {
            return Ok(None);
        }
        reviews::get_review(&self.db, id).await
    }

    pub async fn list_pending(&self) -> Result<Vec<ReviewItem>, CadenceError> {
        reviews::list_pending(&self.db).await
    }

    /// Put a contact on the configured ad script, starting at the first step.
    pub async fn enroll_in_ad_flow(&self, key: &ContactKey) -> Result<Contact, CadenceError> {
        let Some(entry) = self.table.entry_state() else {
            return Err(CadenceError::Internal(
                "cannot enroll in ad flow: scenario has no steps".to_string(),
            ));
        };
        contacts::ensure_contact(&self.db, key).await?;
        contacts::enroll_in_ad_flow(&self.db, key, entry).await?;
        info!(contact = %key, "contact enrolled in ad flow");
        contacts::get_contact(&self.db, key).await?.ok_or_else(|| {
            CadenceError::Internal(format!("contact {key} vanished during enrollment"))
        })
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    fn new_item(
        &self,
        key: &ContactKey,
        triggering: &str,
        draft: &str,
        reason: Option<String>,
    ) -> ReviewItem {
        ReviewItem {
            id: format!("review-{}", Uuid::new_v4()),
            contact_key: key.clone(),
            triggering_message: triggering.to_string(),
            draft_text: draft.to_string(),
            status: ReviewStatus::PendingReview,
            reason,
            regeneration_count: 0,
            created_at: now_iso(),
            decided_at: None,
        }
    }

    async fn generate_with_retry(
        &self,
        context: &ContactContext,
        triggering_text: &str,
    ) -> Result<String, CadenceError> {
        let mut backoff = RETRY_BASE;
        let attempts = self.max_retries.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self
                .generator
                .generate_reply(context, triggering_text, &self.scenario)
                .await
            {
                Ok(draft) => return Ok(draft),
                Err(e) => {
                    warn!(contact = %context.contact.key, attempt, error = %e,
                          "draft generation attempt failed");
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            CadenceError::Internal("generation retry loop produced no error".to_string())
        }))
    }
}
