// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::VecDeque;

use async_trait::async_trait;
use cadence_core::types::{ContactContext, ScenarioConfig};
use cadence_core::{CadenceError, DraftGenerator};
use tokio::sync::Mutex;

/// A [`DraftGenerator`] that replays scripted responses in FIFO order.
///
/// `fail_next` injects errors ahead of the queued responses, which lets a
/// test exercise retry paths without touching the scripted replies.
pub struct MockGenerator {
    responses: Mutex<VecDeque<String>>,
    failures: Mutex<u32>,
    calls: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            failures: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_response(&self, text: &str) {
        self.responses.lock().await.push_back(text.to_string());
    }

    pub async fn fail_next(&self, count: u32) {
        *self.failures.lock().await = count;
    }

    /// Triggering texts passed to `generate_reply`, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftGenerator for MockGenerator {
    async fn generate_reply(
        &self,
        _context: &ContactContext,
        triggering_text: &str,
        _scenario: &ScenarioConfig,
    ) -> Result<String, CadenceError> {
        self.calls.lock().await.push(triggering_text.to_string());

        let mut failures = self.failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(CadenceError::Generation {
                message: "scripted generation failure".to_string(),
                source: None,
            });
        }
        drop(failures);

        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| CadenceError::Generation {
                message: "mock generator response queue is empty".to_string(),
                source: None,
            })
    }
}
