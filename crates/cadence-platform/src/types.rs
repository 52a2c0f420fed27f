// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the messaging platform bridge.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub contact_key: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    pub delivery_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepliedResponse {
    pub replied: bool,
}

/// One raw inbound message as the bridge saw it.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEntry {
    pub contact_key: String,
    pub text: String,
    pub received_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundResponse {
    pub fragments: Vec<InboundEntry>,
}
