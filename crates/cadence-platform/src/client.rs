// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the messaging platform bridge.
//!
//! `send_message` makes exactly one attempt: delivery retry policy lives in
//! the dispatcher, which tracks attempts on the scheduled-send row. Retrying
//! down here would risk duplicate deliveries the upper layer cannot see.

use std::time::Duration;

use async_trait::async_trait;
use cadence_config::PlatformConfig;
use cadence_core::traits::platform::InboundFragment;
use cadence_core::types::ContactKey;
use cadence_core::{CadenceError, MessagingPlatform};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{InboundResponse, RepliedResponse, SendRequest, SendResponse};

#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, CadenceError> {
        let mut headers = HeaderMap::new();
        if !config.api_token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|e| CadenceError::Config(format!("invalid platform api_token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CadenceError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn delivery_err(context: &str, e: reqwest::Error) -> CadenceError {
        CadenceError::Delivery {
            message: format!("{context}: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl MessagingPlatform for PlatformClient {
    async fn send_message(
        &self,
        contact: &ContactKey,
        text: &str,
    ) -> Result<String, CadenceError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&SendRequest {
                contact_key: contact.0.clone(),
                text: text.to_string(),
            })
            .send()
            .await
            .map_err(|e| Self::delivery_err("send request failed", e))?;

        let status = response.status();
        debug!(status = %status, contact = %contact, "send response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CadenceError::Delivery {
                message: format!("platform returned {status}: {body}"),
                source: None,
            });
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| Self::delivery_err("failed to parse send response", e))?;
        Ok(body.delivery_id)
    }

    async fn contact_replied_since(
        &self,
        contact: &ContactKey,
        since_ts: &str,
    ) -> Result<bool, CadenceError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/contacts/{}/replied",
                self.base_url, contact.0
            ))
            .query(&[("since", since_ts)])
            .send()
            .await
            .map_err(|e| Self::delivery_err("replied-since request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CadenceError::Delivery {
                message: format!("platform returned {status}: {body}"),
                source: None,
            });
        }

        let body: RepliedResponse = response
            .json()
            .await
            .map_err(|e| Self::delivery_err("failed to parse replied-since response", e))?;
        Ok(body.replied)
    }

    async fn fetch_inbound(&self, since_ts: &str) -> Result<Vec<InboundFragment>, CadenceError> {
        let response = self
            .client
            .get(format!("{}/v1/inbound", self.base_url))
            .query(&[("since", since_ts)])
            .send()
            .await
            .map_err(|e| Self::delivery_err("inbound poll failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CadenceError::Delivery {
                message: format!("platform returned {status}: {body}"),
                source: None,
            });
        }

        let body: InboundResponse = response
            .json()
            .await
            .map_err(|e| Self::delivery_err("failed to parse inbound response", e))?;
        Ok(body
            .fragments
            .into_iter()
            .map(|f| InboundFragment {
                contact_key: ContactKey(f.contact_key),
                text: f.text,
                received_at: f.received_at,
            })
            .collect())
    }
}
