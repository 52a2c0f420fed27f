// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cadence outreach engine.

use thiserror::Error;

/// The primary error type used across all Cadence crates.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Configuration errors (invalid TOML, missing required fields, bad bounds).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Draft generator errors (API failure, quota, timeout, content policy).
    #[error("generation error: {message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging platform errors (send failure, rate limiting, rejection).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A conditional status update matched zero rows: another process already
    /// claimed or transitioned the record. Expected under concurrency; callers
    /// treat it as a no-op success, never as a retryable failure.
    #[error("state conflict on {entity} {id}: expected status `{expected}`")]
    StateConflict {
        entity: &'static str,
        id: String,
        expected: &'static str,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CadenceError {
    /// Whether this error is a lost-race conflict rather than a real failure.
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, CadenceError::StateConflict { .. })
    }
}
