// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-mode gate: decides whether a candidate reply may skip human review.
//!
//! The decision is a pure function of a toggle snapshot, the conversation
//! category, and the first-contact safety rail. Toggles live in an
//! [`arc_swap`] store so the control surface can flip them at runtime while
//! every decision still sees one consistent snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use cadence_config::model::AutoModeConfig;
use cadence_core::types::{Contact, ConversationCategory, GateDecision, RelationshipStage};
use tracing::info;

/// Immutable snapshot of the auto-mode toggles at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoModeToggles {
    pub general: bool,
    pub ad_flow: bool,
    pub client_care: bool,
    pub force_review_first_contact: bool,
}

impl AutoModeToggles {
    fn category_enabled(&self, category: ConversationCategory) -> bool {
        match category {
            ConversationCategory::General => self.general,
            ConversationCategory::AdFlow => self.ad_flow,
            ConversationCategory::ClientCare => self.client_care,
        }
    }
}

impl From<&AutoModeConfig> for AutoModeToggles {
    fn from(config: &AutoModeConfig) -> Self {
        Self {
            general: config.general,
            ad_flow: config.ad_flow,
            client_care: config.client_care,
            force_review_first_contact: config.force_review_first_contact,
        }
    }
}

/// Runtime store for the toggles, exposed to the auto-mode control surface.
pub struct ToggleStore {
    inner: ArcSwap<AutoModeToggles>,
}

impl ToggleStore {
    pub fn new(initial: AutoModeToggles) -> Self {
        Self {
            inner: ArcSwap::from_pointee(initial),
        }
    }

    /// A consistent snapshot for one gate decision.
    pub fn snapshot(&self) -> Arc<AutoModeToggles> {
        self.inner.load_full()
    }

    /// Flip one category toggle.
    pub fn set_category_enabled(&self, category: ConversationCategory, enabled: bool) {
        let mut next = **self.inner.load();
        match category {
            ConversationCategory::General => next.general = enabled,
            ConversationCategory::AdFlow => next.ad_flow = enabled,
            ConversationCategory::ClientCare => next.client_care = enabled,
        }
        self.inner.store(Arc::new(next));
        info!(category = %category, enabled, "auto-mode toggle changed");
    }
}

/// Derive the conversation category from contact state.
pub fn categorize(contact: &Contact) -> ConversationCategory {
    if contact.is_in_ad_flow {
        ConversationCategory::AdFlow
    } else if contact.relationship_stage == RelationshipStage::PayingClient {
        ConversationCategory::ClientCare
    } else {
        ConversationCategory::General
    }
}

/// The gate itself. Pure; the caller persists whatever this decides.
pub fn decide(
    category: ConversationCategory,
    is_first_contact: bool,
    toggles: &AutoModeToggles,
) -> GateDecision {
    if is_first_contact && toggles.force_review_first_contact {
        return GateDecision::RequireHuman;
    }
    if toggles.category_enabled(category) {
        GateDecision::AutoApprove
    } else {
        GateDecision::RequireHuman
    }
}
