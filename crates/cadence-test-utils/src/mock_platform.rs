// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use cadence_core::traits::platform::InboundFragment;
use cadence_core::types::ContactKey;
use cadence_core::{CadenceError, MessagingPlatform};
use tokio::sync::Mutex;

/// A [`MessagingPlatform`] that records outbound sends and serves scripted
/// inbound traffic and reply flags.
pub struct MockPlatform {
    sent: Mutex<Vec<(ContactKey, String)>>,
    send_failures: Mutex<u32>,
    replied: Mutex<HashMap<String, bool>>,
    inbound: Mutex<VecDeque<InboundFragment>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            send_failures: Mutex::new(0),
            replied: Mutex::new(HashMap::new()),
            inbound: Mutex::new(VecDeque::new()),
        }
    }

    /// Everything delivered through `send_message`, in send order.
    pub async fn sent_messages(&self) -> Vec<(ContactKey, String)> {
        self.sent.lock().await.clone()
    }

    /// Make the next `count` calls to `send_message` fail.
    pub async fn fail_next_sends(&self, count: u32) {
        *self.send_failures.lock().await = count;
    }

    /// Fix the answer `contact_replied_since` gives for a contact.
    pub async fn set_replied(&self, contact: &ContactKey, replied: bool) {
        self.replied.lock().await.insert(contact.0.clone(), replied);
    }

    /// Queue a fragment for the next `fetch_inbound` call.
    pub async fn push_inbound(&self, fragment: InboundFragment) {
        self.inbound.lock().await.push_back(fragment);
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingPlatform for MockPlatform {
    async fn send_message(
        &self,
        contact: &ContactKey,
        text: &str,
    ) -> Result<String, CadenceError> {
        let mut failures = self.send_failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(CadenceError::Delivery {
                message: "scripted delivery failure".to_string(),
                source: None,
            });
        }
        drop(failures);

        let mut sent = self.sent.lock().await;
        sent.push((contact.clone(), text.to_string()));
        Ok(format!("delivery-{}", sent.len()))
    }

    async fn contact_replied_since(
        &self,
        contact: &ContactKey,
        _since_ts: &str,
    ) -> Result<bool, CadenceError> {
        Ok(self
            .replied
            .lock()
            .await
            .get(&contact.0)
            .copied()
            .unwrap_or(false))
    }

    async fn fetch_inbound(&self, _since_ts: &str) -> Result<Vec<InboundFragment>, CadenceError> {
        Ok(self.inbound.lock().await.drain(..).collect())
    }
}
