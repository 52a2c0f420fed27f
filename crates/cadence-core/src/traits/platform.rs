// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging platform trait for the external delivery channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CadenceError;
use crate::types::ContactKey;

/// One raw inbound fragment as delivered by the platform, before the intake
/// buffer coalesces bursts into turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFragment {
    pub contact_key: ContactKey,
    pub text: String,
    pub received_at: String,
}

/// External collaborator that transmits messages to contacts and reports
/// reply activity.
#[async_trait]
pub trait MessagingPlatform: Send + Sync + 'static {
    /// Deliver `text` to `contact`. Returns the platform's delivery id.
    async fn send_message(
        &self,
        contact: &ContactKey,
        text: &str,
    ) -> Result<String, CadenceError>;

    /// Whether `contact` has sent anything since `since_ts` (storage-format
    /// timestamp). Used by opt-out-before-send re-evaluation and the
    /// reconciler.
    async fn contact_replied_since(
        &self,
        contact: &ContactKey,
        since_ts: &str,
    ) -> Result<bool, CadenceError>;

    /// Fetch inbound fragments received since `since_ts`, oldest first.
    async fn fetch_inbound(&self, since_ts: &str) -> Result<Vec<InboundFragment>, CadenceError>;
}
