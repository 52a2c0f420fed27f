// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Cadence workspace.
//!
//! Records mirror their SQLite rows: timestamps are ISO-8601 UTC strings
//! (millisecond precision, `Z` suffix) so that lexicographic order equals
//! chronological order, and status columns round-trip through the enums
//! defined here.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable per-platform handle identifying one contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactKey(pub String);

impl std::fmt::Display for ContactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Relationship stage of a contact. Forward-only: a contact never regresses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStage {
    NewLead,
    Trial,
    PayingClient,
}

impl RelationshipStage {
    /// Position in the forward-only progression, for ordering checks.
    pub fn rank(self) -> u8 {
        match self {
            RelationshipStage::NewLead => 0,
            RelationshipStage::Trial => 1,
            RelationshipStage::PayingClient => 2,
        }
    }
}

/// External signal that advances a contact's relationship stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageSignal {
    /// Billing collaborator reports a trial was started.
    TrialStarted,
    /// Billing collaborator reports a payment was confirmed.
    PaymentConfirmed,
}

/// Position of a contact inside the multi-step ad-response script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AdScriptState {
    /// Contact is not enrolled in the ad script.
    None,
    /// Contact is at the given 1-based step.
    Step(u8),
    /// Contact finished the script and exited the ad flow.
    Completed,
}

impl std::fmt::Display for AdScriptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdScriptState::None => f.write_str("none"),
            AdScriptState::Step(n) => write!(f, "step{n}"),
            AdScriptState::Completed => f.write_str("completed"),
        }
    }
}

impl std::str::FromStr for AdScriptState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AdScriptState::None),
            "completed" => Ok(AdScriptState::Completed),
            other => {
                let n = other
                    .strip_prefix("step")
                    .and_then(|digits| digits.parse::<u8>().ok())
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| format!("invalid ad script state `{other}`"))?;
                Ok(AdScriptState::Step(n))
            }
        }
    }
}

impl From<AdScriptState> for String {
    fn from(s: AdScriptState) -> String {
        s.to_string()
    }
}

impl TryFrom<String> for AdScriptState {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One contact record. Created on first inbound message or external
/// enrollment; archived, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub key: ContactKey,
    pub relationship_stage: RelationshipStage,
    pub ad_script_state: AdScriptState,
    pub is_in_ad_flow: bool,
    /// Free-text reviewer notes passed along in generator context.
    pub profile_notes: Option<String>,
    pub archived: bool,
    pub last_interaction_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One immutable message log entry. Per-contact timestamp order is the
/// authoritative conversation order handed to the draft generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub contact_key: ContactKey,
    pub direction: Direction,
    pub body: String,
    pub created_at: String,
}

/// Status of a candidate reply in the review queue.
///
/// `PendingReview` and `AutoScheduled` are the non-terminal statuses; the
/// one-open-item-per-contact invariant counts exactly these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PendingReview,
    /// Approved (by a human or the auto-mode gate) with a delivery scheduled.
    AutoScheduled,
    Sent,
    Rejected,
    Skipped,
}

impl ReviewStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReviewStatus::Sent | ReviewStatus::Rejected | ReviewStatus::Skipped
        )
    }
}

/// One candidate reply awaiting a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: String,
    pub contact_key: ContactKey,
    /// The coalesced inbound turn that caused this draft.
    pub triggering_message: String,
    pub draft_text: String,
    pub status: ReviewStatus,
    /// Rejection/skip reason, or the generation failure surfaced to a human.
    pub reason: Option<String>,
    pub regeneration_count: i64,
    pub created_at: String,
    pub decided_at: Option<String>,
}

/// Status of a scheduled delivery. Transitions are monotonic:
/// `scheduled -> sent` or `scheduled -> cancelled`, never reopened.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Sent,
    Cancelled,
}

/// A commitment to deliver an approved text at a future time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSend {
    pub id: String,
    pub review_id: String,
    pub contact_key: ContactKey,
    pub send_text: String,
    pub delay_minutes: i64,
    pub scheduled_at: String,
    pub status: ScheduleStatus,
    pub attempts: i64,
    pub max_attempts: i64,
    /// Audit trail for out-of-band resolutions (reconciler, replied-skip).
    pub audit_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Which automation category a conversation belongs to, derived from contact
/// state: in the ad flow, an established paying client, or general chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationCategory {
    General,
    AdFlow,
    ClientCare,
}

/// Outcome of the auto-mode gate for one review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The draft must wait for a human decision.
    RequireHuman,
    /// The draft may be scheduled without human approval.
    AutoApprove,
}

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// The message was delivered; the platform returned this delivery id.
    Sent { delivery_id: String },
    /// Another process claimed the send first; nothing was delivered here.
    AlreadyClaimed,
    /// The send was cancelled before delivery (e.g. the contact replied
    /// after scheduling); the owning review item was marked skipped.
    Skipped { reason: String },
}

/// Ordered conversation context handed to the draft generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactContext {
    pub contact: Contact,
    /// Recent messages in chronological order.
    pub recent_messages: Vec<Message>,
}

/// One step of the ad-response script: the regex an inbound message must
/// match to advance past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub name: String,
    pub trigger: String,
}

/// Scenario configuration for the ad-response script, shared by the state
/// machine (transition table) and the draft generator (prompt assembly).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub steps: Vec<ScenarioStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ad_script_state_round_trips() {
        for s in [
            AdScriptState::None,
            AdScriptState::Step(1),
            AdScriptState::Step(5),
            AdScriptState::Completed,
        ] {
            let parsed = AdScriptState::from_str(&s.to_string()).unwrap();
            assert_eq!(s, parsed);
        }
    }

    #[test]
    fn ad_script_state_rejects_garbage() {
        assert!(AdScriptState::from_str("step0").is_err());
        assert!(AdScriptState::from_str("stepx").is_err());
        assert!(AdScriptState::from_str("done").is_err());
    }

    #[test]
    fn review_status_terminality() {
        assert!(!ReviewStatus::PendingReview.is_terminal());
        assert!(!ReviewStatus::AutoScheduled.is_terminal());
        assert!(ReviewStatus::Sent.is_terminal());
        assert!(ReviewStatus::Rejected.is_terminal());
        assert!(ReviewStatus::Skipped.is_terminal());
    }

    #[test]
    fn status_strings_match_storage_convention() {
        assert_eq!(ReviewStatus::PendingReview.to_string(), "pending_review");
        assert_eq!(ScheduleStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(RelationshipStage::PayingClient.to_string(), "paying_client");
        assert_eq!(
            ReviewStatus::from_str("auto_scheduled").unwrap(),
            ReviewStatus::AutoScheduled
        );
    }

    #[test]
    fn stage_rank_is_forward_only_ordering() {
        assert!(RelationshipStage::NewLead.rank() < RelationshipStage::Trial.rank());
        assert!(RelationshipStage::Trial.rank() < RelationshipStage::PayingClient.rank());
    }
}
