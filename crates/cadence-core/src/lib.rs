// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadence outreach engine.
//!
//! Provides the error taxonomy, domain types, timestamp helpers, and the
//! adapter traits for the two external collaborators (draft generator and
//! messaging platform). All other crates in the workspace build on this one.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::CadenceError;
pub use traits::{DraftGenerator, MessagingPlatform};
pub use types::{
    AdScriptState, Contact, ContactContext, ContactKey, ConversationCategory, Direction,
    DispatchResult, GateDecision, Message, RelationshipStage, ReviewItem, ReviewStatus,
    ScenarioConfig, ScenarioStep, ScheduleStatus, ScheduledSend, StageSignal,
};
