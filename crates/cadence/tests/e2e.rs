// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flow through mock adapters: inbound fragments are coalesced
//! into one turn, drafted, approved, scheduled with a human-plausible delay,
//! and dispatched exactly once.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::time::now_iso;
use cadence_core::types::{
    ContactKey, Direction, DispatchResult, ReviewStatus, ScenarioConfig, ScenarioStep,
    ScheduleStatus,
};
use cadence_engine::{AutoModeToggles, Dispatcher, IntakeBuffer, Reconciler, ReviewQueue,
    Scheduler, ToggleStore};
use cadence_storage::Database;
use cadence_storage::queries::{contacts, messages, reviews, schedules};
use cadence_test_utils::{MockGenerator, MockPlatform};
use tempfile::tempdir;

fn scenario() -> ScenarioConfig {
    ScenarioConfig {
        steps: vec![ScenarioStep {
            name: "opener".into(),
            trigger: "(?i)interested".into(),
        }],
    }
}

struct Harness {
    db: Database,
    generator: Arc<MockGenerator>,
    platform: Arc<MockPlatform>,
    buffer: IntakeBuffer,
    queue: ReviewQueue,
    dispatcher: Dispatcher,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("cadence.db").to_str().unwrap())
        .await
        .unwrap();
    let generator = Arc::new(MockGenerator::new());
    let platform = Arc::new(MockPlatform::new());
    let toggles = Arc::new(ToggleStore::new(AutoModeToggles {
        general: false,
        ad_flow: false,
        client_care: false,
        force_review_first_contact: true,
    }));
    let scheduler = Arc::new(Scheduler::new(
        db.clone(),
        &cadence_config::SchedulerConfig {
            min_delay_minutes: 10,
            max_delay_minutes: 90,
            poll_secs: 60,
        },
        3,
    ));
    let queue = ReviewQueue::new(
        db.clone(),
        generator.clone(),
        &scenario(),
        toggles,
        scheduler,
        2,
    )
    .unwrap();
    let dispatcher = Dispatcher::new(db.clone(), platform.clone());
    Harness {
        db,
        generator,
        platform,
        buffer: IntakeBuffer::new(Duration::from_millis(50)),
        queue,
        dispatcher,
        _dir: dir,
    }
}

#[tokio::test]
async fn jane_doe_full_flow() {
    let h = harness().await;
    h.generator.push_response("Hey! How's it going?").await;

    // Two quick fragments coalesce into one turn.
    let first_ts = now_iso();
    h.buffer
        .ingest(ContactKey("jane_doe".into()), "hi".into(), first_ts.clone())
        .await;
    h.buffer
        .ingest(
            ContactKey("jane_doe".into()),
            "are you there?".into(),
            now_iso(),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    let turns = h.buffer.drain_expired().await;
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "hi\nare you there?");
    assert_eq!(turns[0].received_at, first_ts);

    // The turn produces a pending draft from the generator.
    let item = h.queue.handle_turn(&turns[0]).await.unwrap();
    assert_eq!(item.status, ReviewStatus::PendingReview);
    assert_eq!(item.draft_text, "Hey! How's it going?");

    // Approval schedules delivery with a delay in the configured range.
    let send = h.queue.approve(&item.id, None).await.unwrap().unwrap();
    assert!((10..=90).contains(&send.delay_minutes));

    // Pretend the delay elapsed and dispatch.
    let result = h.dispatcher.dispatch(&send).await.unwrap();
    assert!(matches!(result, DispatchResult::Sent { .. }));

    // Conversation log: coalesced inbound first, then the outbound reply.
    let key = ContactKey("jane_doe".into());
    let log = messages::get_messages_for_contact(&h.db, &key).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].direction, Direction::Inbound);
    assert_eq!(log[0].body, "hi\nare you there?");
    assert_eq!(log[1].direction, Direction::Outbound);
    assert_eq!(log[1].body, "Hey! How's it going?");

    // Final states: review sent, schedule sent, last interaction stamped.
    let item = reviews::get_review(&h.db, &item.id).await.unwrap().unwrap();
    assert_eq!(item.status, ReviewStatus::Sent);
    let send = schedules::get_schedule(&h.db, &send.id).await.unwrap().unwrap();
    assert_eq!(send.status, ScheduleStatus::Sent);
    let contact = contacts::get_contact(&h.db, &key).await.unwrap().unwrap();
    assert!(contact.last_interaction_at.is_some());

    assert_eq!(h.platform.sent_messages().await.len(), 1);

    h.db.close().await.unwrap();
}

#[tokio::test]
async fn second_turn_supersedes_and_only_one_delivery_happens() {
    let h = harness().await;
    h.generator.push_response("draft one").await;
    h.generator.push_response("draft two").await;

    h.buffer
        .ingest(ContactKey("jane_doe".into()), "hi".into(), now_iso())
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    let turns = h.buffer.drain_expired().await;
    let first = h.queue.handle_turn(&turns[0]).await.unwrap();
    let first_send = h.queue.approve(&first.id, None).await.unwrap().unwrap();

    // A newer turn lands before anything is delivered.
    h.buffer
        .ingest(
            ContactKey("jane_doe".into()),
            "wait, one more thing".into(),
            now_iso(),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    let turns = h.buffer.drain_expired().await;
    let second = h.queue.handle_turn(&turns[0]).await.unwrap();
    let second_send = h.queue.approve(&second.id, None).await.unwrap().unwrap();

    // The superseded send is cancelled; dispatching it is a no-op.
    let result = h.dispatcher.dispatch(&first_send).await.unwrap();
    assert_eq!(result, DispatchResult::AlreadyClaimed);
    let result = h.dispatcher.dispatch(&second_send).await.unwrap();
    assert!(matches!(result, DispatchResult::Sent { .. }));

    assert_eq!(h.platform.sent_messages().await.len(), 1);
    assert_eq!(h.platform.sent_messages().await[0].1, "draft two");

    h.db.close().await.unwrap();
}

#[tokio::test]
async fn reconciler_repairs_a_stalled_send() {
    let h = harness().await;
    h.generator.push_response("stalled draft").await;

    h.buffer
        .ingest(ContactKey("jane_doe".into()), "hi".into(), now_iso())
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    let turns = h.buffer.drain_expired().await;
    let item = h.queue.handle_turn(&turns[0]).await.unwrap();
    h.queue.approve(&item.id, None).await.unwrap().unwrap();

    // Zero grace makes the fresh send count as overdue immediately after
    // its scheduled_at passes; with delays >= 10 minutes it is not yet due,
    // so a sweep right now must leave it alone.
    let dispatcher = Arc::new(Dispatcher::new(h.db.clone(), h.platform.clone()));
    let reconciler = Reconciler::new(h.db.clone(), dispatcher, 0);
    assert!(reconciler.sweep().await.unwrap().is_empty());
    assert!(h.platform.sent_messages().await.is_empty());

    h.db.close().await.unwrap();
}
