// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact state machine: relationship stages and the ad-response script.
//!
//! Both machines are table-driven. Stage edges are fixed and forward-only,
//! triggered by external billing signals. Ad-script steps come from scenario
//! configuration and compile at startup into an explicit transition table
//! `(current step, trigger regex) -> next step`; an inbound message that
//! matches no trigger leaves state unchanged, never skips ahead.

use cadence_core::CadenceError;
use cadence_core::types::{
    AdScriptState, Contact, ContactKey, RelationshipStage, ScenarioConfig, StageSignal,
};
use cadence_storage::Database;
use cadence_storage::queries::contacts;
use regex::Regex;
use tracing::{debug, info, warn};

/// The fixed forward-only stage edge for a billing signal, if any.
pub fn next_stage(current: RelationshipStage, signal: StageSignal) -> Option<RelationshipStage> {
    match (current, signal) {
        (RelationshipStage::NewLead, StageSignal::TrialStarted) => Some(RelationshipStage::Trial),
        (RelationshipStage::Trial, StageSignal::PaymentConfirmed) => {
            Some(RelationshipStage::PayingClient)
        }
        // No automatic regression and no stage skipping.
        _ => None,
    }
}

struct CompiledStep {
    name: String,
    trigger: Regex,
    from: AdScriptState,
    to: AdScriptState,
}

/// Compiled ad-script transition table.
pub struct TransitionTable {
    steps: Vec<CompiledStep>,
}

impl TransitionTable {
    /// Compile and validate a scenario at startup.
    ///
    /// Steps are numbered in order; the last step transitions to
    /// `completed`. Fails on empty or duplicate step names and on trigger
    /// patterns that do not compile, so dead or unreachable steps cannot
    /// exist by construction.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, CadenceError> {
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut seen = std::collections::HashSet::new();
        let last = scenario.steps.len();

        for (i, step) in scenario.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(CadenceError::Config(format!(
                    "scenario step {} has an empty name",
                    i + 1
                )));
            }
            if !seen.insert(step.name.clone()) {
                return Err(CadenceError::Config(format!(
                    "scenario step name `{}` is duplicated",
                    step.name
                )));
            }
            let trigger = Regex::new(&step.trigger).map_err(|e| {
                CadenceError::Config(format!(
                    "scenario step `{}` has an invalid trigger: {e}",
                    step.name
                ))
            })?;
            let n = (i + 1) as u8;
            steps.push(CompiledStep {
                name: step.name.clone(),
                trigger,
                from: AdScriptState::Step(n),
                to: if i + 1 == last {
                    AdScriptState::Completed
                } else {
                    AdScriptState::Step(n + 1)
                },
            });
        }
        Ok(Self { steps })
    }

    /// First step of the script, for enrollment. `None` for an empty script.
    pub fn entry_state(&self) -> Option<AdScriptState> {
        self.steps.first().map(|s| s.from)
    }

    /// The state after `inbound` arrives at `current`, or `None` when the
    /// trigger does not match (state stays put).
    pub fn next_state(&self, current: AdScriptState, inbound: &str) -> Option<AdScriptState> {
        self.steps
            .iter()
            .find(|s| s.from == current)
            .filter(|s| s.trigger.is_match(inbound))
            .map(|s| s.to)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step name for logging, if `state` is a live step.
    pub fn step_name(&self, state: AdScriptState) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.from == state)
            .map(|s| s.name.as_str())
    }
}

/// Advance a contact's ad-script state for an inbound turn, persisting the
/// transition with a conditional write.
///
/// Returns the contact record after the attempt. An unmatched trigger is a
/// no-op; losing the conditional write to a concurrent process is also a
/// no-op (the fresher state is re-read and returned). Reaching `completed`
/// clears the ad-flow flag so the contact exits into the normal stage
/// machine.
pub async fn apply_ad_trigger(
    db: &Database,
    table: &TransitionTable,
    contact: &Contact,
    inbound: &str,
) -> Result<Contact, CadenceError> {
    if !contact.is_in_ad_flow {
        return Ok(contact.clone());
    }
    let Some(next) = table.next_state(contact.ad_script_state, inbound) else {
        debug!(
            contact = %contact.key,
            state = %contact.ad_script_state,
            "inbound did not match the current step trigger; state unchanged"
        );
        return Ok(contact.clone());
    };

    let still_in_flow = next != AdScriptState::Completed;
    let advanced = contacts::advance_state(
        db,
        &contact.key,
        contact.relationship_stage,
        contact.ad_script_state,
        contact.relationship_stage,
        next,
        still_in_flow,
    )
    .await?;

    if advanced {
        info!(
            contact = %contact.key,
            from = %contact.ad_script_state,
            to = %next,
            "ad script advanced"
        );
    } else {
        warn!(
            contact = %contact.key,
            expected = %contact.ad_script_state,
            "ad script advance lost a concurrent transition; keeping fresher state"
        );
    }

    contacts::get_contact(db, &contact.key)
        .await?
        .ok_or_else(|| CadenceError::Internal(format!("contact {} vanished", contact.key)))
}

/// Record an external billing signal against a contact.
///
/// Returns `true` if the stage advanced. Signals that do not apply to the
/// current stage (including replays of already-applied signals) are no-ops,
/// which makes delivery of the same signal idempotent.
pub async fn record_stage_signal(
    db: &Database,
    key: &ContactKey,
    signal: StageSignal,
) -> Result<bool, CadenceError> {
    let Some(contact) = contacts::get_contact(db, key).await? else {
        return Err(CadenceError::Internal(format!("unknown contact {key}")));
    };
    let Some(to_stage) = next_stage(contact.relationship_stage, signal) else {
        debug!(contact = %key, stage = %contact.relationship_stage, signal = %signal,
               "stage signal does not apply; state unchanged");
        return Ok(false);
    };

    let advanced = contacts::advance_state(
        db,
        key,
        contact.relationship_stage,
        contact.ad_script_state,
        to_stage,
        contact.ad_script_state,
        contact.is_in_ad_flow,
    )
    .await?;
    if advanced {
        info!(contact = %key, from = %contact.relationship_stage, to = %to_stage, "stage advanced");
    }
    Ok(advanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::ScenarioStep;
    use tempfile::tempdir;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig {
            steps: vec![
                ScenarioStep {
                    name: "goal".into(),
                    trigger: r"(?i)\b(lose|gain|fit)\b".into(),
                },
                ScenarioStep {
                    name: "availability".into(),
                    trigger: r"(?i)\b(week|day)\b".into(),
                },
                ScenarioStep {
                    name: "commitment".into(),
                    trigger: r"(?i)\b(yes|ready)\b".into(),
                },
            ],
        }
    }

    #[test]
    fn table_numbers_steps_and_terminates_in_completed() {
        let table = TransitionTable::from_scenario(&scenario()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.entry_state(), Some(AdScriptState::Step(1)));
        assert_eq!(
            table.next_state(AdScriptState::Step(1), "I want to lose weight"),
            Some(AdScriptState::Step(2))
        );
        assert_eq!(
            table.next_state(AdScriptState::Step(3), "yes let's go"),
            Some(AdScriptState::Completed)
        );
    }

    #[test]
    fn unmatched_trigger_does_not_advance() {
        let table = TransitionTable::from_scenario(&scenario()).unwrap();
        assert_eq!(table.next_state(AdScriptState::Step(1), "hello there"), None);
        // Never skip ahead: a later step's trigger is irrelevant at step 1.
        assert_eq!(table.next_state(AdScriptState::Step(1), "yes ready"), None);
    }

    #[test]
    fn invalid_scenarios_fail_at_compile() {
        let mut bad = scenario();
        bad.steps[1].trigger = "(unclosed".into();
        assert!(TransitionTable::from_scenario(&bad).is_err());

        let mut dup = scenario();
        dup.steps[2].name = "goal".into();
        assert!(TransitionTable::from_scenario(&dup).is_err());
    }

    #[test]
    fn stage_edges_are_forward_only() {
        use RelationshipStage::*;
        use StageSignal::*;
        assert_eq!(next_stage(NewLead, TrialStarted), Some(Trial));
        assert_eq!(next_stage(Trial, PaymentConfirmed), Some(PayingClient));
        // Signals that would skip or regress do nothing.
        assert_eq!(next_stage(NewLead, PaymentConfirmed), None);
        assert_eq!(next_stage(PayingClient, TrialStarted), None);
        assert_eq!(next_stage(PayingClient, PaymentConfirmed), None);
    }

    #[tokio::test]
    async fn ad_trigger_walks_a_contact_to_completion() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let table = TransitionTable::from_scenario(&scenario()).unwrap();
        let key = ContactKey("ad-lead".into());
        contacts::ensure_contact(&db, &key).await.unwrap();
        contacts::enroll_in_ad_flow(&db, &key, table.entry_state().unwrap())
            .await
            .unwrap();

        let contact = contacts::get_contact(&db, &key).await.unwrap().unwrap();
        let contact = apply_ad_trigger(&db, &table, &contact, "I want to lose weight")
            .await
            .unwrap();
        assert_eq!(contact.ad_script_state, AdScriptState::Step(2));

        // Off-script message: no movement.
        let contact = apply_ad_trigger(&db, &table, &contact, "haha nice")
            .await
            .unwrap();
        assert_eq!(contact.ad_script_state, AdScriptState::Step(2));

        let contact = apply_ad_trigger(&db, &table, &contact, "3 days a week works")
            .await
            .unwrap();
        let contact = apply_ad_trigger(&db, &table, &contact, "yes, ready to start")
            .await
            .unwrap();
        assert_eq!(contact.ad_script_state, AdScriptState::Completed);
        assert!(!contact.is_in_ad_flow, "completion exits the ad flow");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stage_signal_is_idempotent_under_replay() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let key = ContactKey("lead".into());
        contacts::ensure_contact(&db, &key).await.unwrap();

        assert!(record_stage_signal(&db, &key, StageSignal::TrialStarted).await.unwrap());
        // Replay: already in trial, signal no longer applies.
        assert!(!record_stage_signal(&db, &key, StageSignal::TrialStarted).await.unwrap());

        assert!(record_stage_signal(&db, &key, StageSignal::PaymentConfirmed).await.unwrap());
        let contact = contacts::get_contact(&db, &key).await.unwrap().unwrap();
        assert_eq!(contact.relationship_stage, RelationshipStage::PayingClient);

        db.close().await.unwrap();
    }
}
