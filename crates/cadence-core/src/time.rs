// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp helpers.
//!
//! All persisted timestamps use the same ISO-8601 UTC format the storage
//! layer writes with `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`, so strings
//! produced here compare correctly against column defaults.

use chrono::{DateTime, Duration, Utc};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in storage format.
pub fn now_iso() -> String {
    format_iso(Utc::now())
}

/// Format a UTC instant in storage format.
pub fn format_iso(ts: DateTime<Utc>) -> String {
    ts.format(ISO_FORMAT).to_string()
}

/// Parse a storage-format timestamp.
pub fn parse_iso(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// A storage-format timestamp `minutes` after `from`.
pub fn plus_minutes(from: DateTime<Utc>, minutes: i64) -> String {
    format_iso(from + Duration::minutes(minutes))
}
