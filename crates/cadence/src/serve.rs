// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence serve` command implementation.
//!
//! Starts the full engine: the inbound poll and intake flush loops, the
//! review pipeline consuming coalesced turns, the scheduler poll loop, and
//! the drift reconciler. Supports graceful shutdown via ctrl-c, flushing
//! any still-buffered fragments before the store is closed.

use std::sync::Arc;
use std::time::Duration;

use cadence_config::CadenceConfig;
use cadence_core::time::now_iso;
use cadence_core::{CadenceError, DraftGenerator, MessagingPlatform};
use cadence_engine::{
    AutoModeToggles, Dispatcher, IntakeBuffer, Reconciler, ReviewQueue, Scheduler, ToggleStore,
    Turn,
};
use cadence_generator::DraftServiceClient;
use cadence_platform::PlatformClient;
use cadence_storage::Database;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Runs the `cadence serve` command.
pub async fn run_serve(config: CadenceConfig) -> Result<(), CadenceError> {
    init_tracing(&config.engine.log_level);

    info!(name = %config.engine.name, "starting cadence serve");

    let db = Database::open(&config.storage.database_path).await?;

    let generator: Arc<dyn DraftGenerator> = Arc::new(DraftServiceClient::new(&config.generator)?);
    let platform: Arc<dyn MessagingPlatform> = Arc::new(PlatformClient::new(&config.platform)?);

    let toggles = Arc::new(ToggleStore::new(AutoModeToggles::from(&config.automode)));
    let scheduler = Arc::new(Scheduler::new(
        db.clone(),
        &config.scheduler,
        config.dispatcher.max_attempts,
    ));
    let dispatcher = Arc::new(Dispatcher::new(db.clone(), platform.clone()));
    let queue = Arc::new(ReviewQueue::new(
        db.clone(),
        generator,
        &config.scenario,
        toggles,
        scheduler.clone(),
        config.generator.max_retries,
    )?);
    let reconciler = Arc::new(Reconciler::new(
        db.clone(),
        dispatcher.clone(),
        config.reconciler.grace_minutes,
    ));
    let buffer = Arc::new(IntakeBuffer::new(Duration::from_secs(
        config.intake.window_secs,
    )));

    let (tx, mut rx) = mpsc::channel::<Turn>(64);

    let flush_task = tokio::spawn(
        buffer
            .clone()
            .run(Duration::from_secs(config.intake.flush_poll_secs), tx),
    );
    let poll_task = tokio::spawn(poll_inbound(
        platform.clone(),
        buffer.clone(),
        Duration::from_secs(config.intake.inbound_poll_secs),
    ));
    let scheduler_task = tokio::spawn(scheduler.clone().run(dispatcher.clone()));
    let reconciler_task = tokio::spawn(
        reconciler
            .clone()
            .run(Duration::from_secs(config.reconciler.interval_secs)),
    );

    let turn_queue = queue.clone();
    let turn_task = tokio::spawn(async move {
        while let Some(turn) = rx.recv().await {
            if let Err(e) = turn_queue.handle_turn(&turn).await {
                error!(contact = %turn.contact_key, error = %e, "failed to process turn");
            }
        }
    });

    info!("cadence serve running");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CadenceError::Internal(format!("failed to listen for ctrl-c: {e}")))?;
    info!("shutdown signal received");

    poll_task.abort();
    scheduler_task.abort();
    reconciler_task.abort();
    // Aborting the flush loop drops the channel sender, which ends the turn
    // consumer once the queue drains.
    flush_task.abort();
    let _ = turn_task.await;

    // Windows still open at shutdown are flushed early rather than dropped.
    for turn in buffer.flush_all().await {
        if let Err(e) = queue.handle_turn(&turn).await {
            error!(contact = %turn.contact_key, error = %e, "failed to process buffered turn");
        }
    }

    db.close().await?;
    info!("cadence serve shutdown complete");
    Ok(())
}

/// Polls the platform bridge for new inbound fragments and feeds them into
/// the intake buffer. The high-water mark advances to the newest fragment
/// seen, so a failed poll is retried from the same point.
async fn poll_inbound(
    platform: Arc<dyn MessagingPlatform>,
    buffer: Arc<IntakeBuffer>,
    poll: Duration,
) {
    let mut since = now_iso();
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        match platform.fetch_inbound(&since).await {
            Ok(fragments) => {
                for fragment in fragments {
                    if fragment.received_at.as_str() > since.as_str() {
                        since = fragment.received_at.clone();
                    }
                    buffer
                        .ingest(fragment.contact_key, fragment.text, fragment.received_at)
                        .await;
                }
            }
            Err(e) => {
                warn!(error = %e, "inbound poll failed; will retry");
            }
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadence={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
