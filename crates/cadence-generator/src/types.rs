// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the draft-generation service.

use serde::{Deserialize, Serialize};

/// A request to draft a reply for a contact.
#[derive(Debug, Clone, Serialize)]
pub struct DraftRequest {
    /// Who the reply is for.
    pub contact: ContactSummary,

    /// Recent conversation history, oldest first.
    pub history: Vec<HistoryEntry>,

    /// The coalesced inbound turn being replied to.
    pub inbound_text: String,

    /// Name of the contact's current ad-script step, if they are on one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_step: Option<String>,
}

/// What the generator needs to know about the contact.
#[derive(Debug, Clone, Serialize)]
pub struct ContactSummary {
    pub key: String,
    pub relationship_stage: String,
    pub ad_script_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub direction: String,
    pub body: String,
}

/// A successful draft response.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftResponse {
    pub draft: String,
}

/// Error body shape returned by the service.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}
