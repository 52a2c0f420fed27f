// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outreach engine: intake coalescing, contact state transitions, the
//! review queue and auto-mode gate, randomized scheduling, idempotent
//! dispatch, and the drift reconciler.
//!
//! Everything here runs against the shared SQLite store from
//! `cadence-storage`; external systems (draft generation, the messaging
//! platform) enter through the trait objects defined in `cadence-core`.

pub mod dispatcher;
pub mod gate;
pub mod intake;
pub mod reconciler;
pub mod review;
pub mod scheduler;
pub mod state_machine;

pub use dispatcher::Dispatcher;
pub use gate::{AutoModeToggles, ToggleStore};
pub use intake::{IntakeBuffer, Turn};
pub use reconciler::{DriftKind, DriftRecord, Reconciler};
pub use review::ReviewQueue;
pub use scheduler::Scheduler;
pub use state_machine::TransitionTable;
