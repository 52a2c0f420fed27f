// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the draft-generation service.
//!
//! Provides [`DraftServiceClient`] which handles request construction,
//! bearer authentication, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use cadence_config::GeneratorConfig;
use cadence_core::types::{AdScriptState, ContactContext, ScenarioConfig};
use cadence_core::{CadenceError, DraftGenerator};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ContactSummary, DraftRequest, DraftResponse, HistoryEntry};

/// HTTP client for the draft-generation service.
///
/// Retries transient errors (429, 500, 503) with a 1-second delay, bounded
/// by the configured retry count.
#[derive(Debug, Clone)]
pub struct DraftServiceClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl DraftServiceClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self, CadenceError> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| CadenceError::Config(format!("invalid generator api_key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CadenceError::Generation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    fn build_request(
        context: &ContactContext,
        triggering_text: &str,
        scenario: &ScenarioConfig,
    ) -> DraftRequest {
        let scenario_step = match context.contact.ad_script_state {
            AdScriptState::Step(n) => scenario
                .steps
                .get(usize::from(n) - 1)
                .map(|s| s.name.clone()),
            _ => None,
        };
        DraftRequest {
            contact: ContactSummary {
                key: context.contact.key.0.clone(),
                relationship_stage: context.contact.relationship_stage.to_string(),
                ad_script_state: context.contact.ad_script_state.to_string(),
                profile_notes: context.contact.profile_notes.clone(),
            },
            history: context
                .recent_messages
                .iter()
                .map(|m| HistoryEntry {
                    direction: m.direction.to_string(),
                    body: m.body.clone(),
                })
                .collect(),
            inbound_text: triggering_text.to_string(),
            scenario_step,
        }
    }
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
    )
}

#[async_trait]
impl DraftGenerator for DraftServiceClient {
    async fn generate_reply(
        &self,
        context: &ContactContext,
        triggering_text: &str,
        scenario: &ScenarioConfig,
    ) -> Result<String, CadenceError> {
        let request = Self::build_request(context, triggering_text, scenario);
        let url = format!("{}/v1/drafts", self.base_url);

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying draft request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| CadenceError::Generation {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, contact = %context.contact.key,
                   "draft response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| CadenceError::Generation {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let draft: DraftResponse =
                    serde_json::from_str(&body).map_err(|e| CadenceError::Generation {
                        message: format!("failed to parse draft response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(draft.draft);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(CadenceError::Generation {
                    message: format!("generator returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!(
                    "generator error ({}): {}",
                    api_err.error.type_, api_err.error.message
                )
            } else {
                format!("generator returned {status}: {body}")
            };
            return Err(CadenceError::Generation {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| CadenceError::Generation {
            message: "draft request failed after retries".into(),
            source: None,
        }))
    }
}
