// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence status` command implementation.
//!
//! Reads queue depths and contact counts straight from the store; works
//! whether or not a serve process is running.

use cadence_config::CadenceConfig;
use cadence_core::CadenceError;
use cadence_core::types::{ReviewStatus, ScheduleStatus};
use cadence_storage::Database;
use cadence_storage::queries::{contacts, reviews, schedules};
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub contacts: i64,
    pub pending_review: i64,
    pub auto_scheduled: i64,
    pub sends_scheduled: i64,
    pub sends_sent: i64,
    pub sends_cancelled: i64,
}

/// Run the `cadence status` command.
pub async fn run_status(config: &CadenceConfig, json: bool) -> Result<(), CadenceError> {
    let db = Database::open(&config.storage.database_path).await?;

    let report = StatusReport {
        contacts: contacts::count_contacts(&db).await?,
        pending_review: reviews::count_by_status(&db, ReviewStatus::PendingReview).await?,
        auto_scheduled: reviews::count_by_status(&db, ReviewStatus::AutoScheduled).await?,
        sends_scheduled: schedules::count_by_status(&db, ScheduleStatus::Scheduled).await?,
        sends_sent: schedules::count_by_status(&db, ScheduleStatus::Sent).await?,
        sends_cancelled: schedules::count_by_status(&db, ScheduleStatus::Cancelled).await?,
    };
    db.close().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| CadenceError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        println!("contacts:          {}", report.contacts);
        println!("pending review:    {}", report.pending_review);
        println!("awaiting dispatch: {}", report.auto_scheduled);
        println!("sends scheduled:   {}", report.sends_scheduled);
        println!("sends delivered:   {}", report.sends_sent);
        println!("sends cancelled:   {}", report.sends_cancelled);
    }
    Ok(())
}
