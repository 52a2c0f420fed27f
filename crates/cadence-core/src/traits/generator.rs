// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft generator trait for the external AI reply writer.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::types::{ContactContext, ScenarioConfig};

/// External collaborator that drafts a candidate reply from conversation
/// context.
///
/// Implementations must return typed [`CadenceError::Generation`] errors for
/// quota, timeout, and content-policy rejections; the pipeline retries with
/// bounded backoff and surfaces exhausted failures to the review queue.
#[async_trait]
pub trait DraftGenerator: Send + Sync + 'static {
    /// Draft a reply to `triggering_text` given ordered conversation context
    /// and the active scenario configuration.
    async fn generate_reply(
        &self,
        context: &ContactContext,
        triggering_text: &str,
        scenario: &ScenarioConfig,
    ) -> Result<String, CadenceError>;
}
