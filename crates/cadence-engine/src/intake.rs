// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intake buffer: coalesces rapid inbound bursts into one logical turn.
//!
//! Humans frequently send multi-part messages; drafting a reply per fragment
//! would produce redundant, incoherent drafts. Fragments accumulate per
//! contact for a fixed window measured from the first unconsumed fragment;
//! on expiry they are joined with line breaks, in arrival order, and emitted
//! downstream exactly once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_core::types::ContactKey;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// One coalesced logical inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub contact_key: ContactKey,
    /// Fragments joined with `\n` in arrival order.
    pub text: String,
    /// Arrival time of the first fragment, storage format.
    pub received_at: String,
}

struct PendingTurn {
    fragments: Vec<String>,
    first_received_at: String,
    window_started: Instant,
}

/// Per-contact fragment accumulator.
pub struct IntakeBuffer {
    window: Duration,
    pending: Mutex<HashMap<ContactKey, PendingTurn>>,
}

impl IntakeBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Record one inbound fragment. The window starts at the contact's first
    /// unconsumed fragment; later fragments join the open window without
    /// extending it.
    pub async fn ingest(&self, contact: ContactKey, text: String, received_at: String) {
        let mut pending = self.pending.lock().await;
        match pending.get_mut(&contact) {
            Some(turn) => turn.fragments.push(text),
            None => {
                pending.insert(
                    contact,
                    PendingTurn {
                        fragments: vec![text],
                        first_received_at: received_at,
                        window_started: Instant::now(),
                    },
                );
            }
        }
    }

    /// Emit every turn whose window has expired.
    pub async fn drain_expired(&self) -> Vec<Turn> {
        let mut pending = self.pending.lock().await;
        let now = Instant::now();
        let expired: Vec<ContactKey> = pending
            .iter()
            .filter(|(_, turn)| now.duration_since(turn.window_started) >= self.window)
            .map(|(key, _)| key.clone())
            .collect();

        let mut turns = Vec::new();
        for key in expired {
            if let Some(turn) = pending.remove(&key) {
                debug!(contact = %key, fragments = turn.fragments.len(), "turn coalesced");
                turns.push(Turn {
                    contact_key: key,
                    text: turn.fragments.join("\n"),
                    received_at: turn.first_received_at,
                });
            }
        }
        turns
    }

    /// Emit everything immediately, regardless of window. Used at shutdown
    /// so buffered fragments are not lost.
    pub async fn flush_all(&self) -> Vec<Turn> {
        let mut pending = self.pending.lock().await;
        pending
            .drain()
            .map(|(key, turn)| Turn {
                contact_key: key,
                text: turn.fragments.join("\n"),
                received_at: turn.first_received_at,
            })
            .collect()
    }

    /// Poll loop forwarding expired turns downstream. Exits when the
    /// receiver is dropped.
    pub async fn run(self: Arc<Self>, poll: Duration, tx: mpsc::Sender<Turn>) {
        let mut interval = tokio::time::interval(poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            for turn in self.drain_expired().await {
                if tx.send(turn).await.is_err() {
                    warn!("intake receiver dropped; stopping flush loop");
                    return;
                }
            }
        }
    }
}
