// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Cadence outreach engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! operations for the four stores: contacts, messages, review items, and
//! scheduled sends. Every correctness-bearing status transition is a single
//! conditional `UPDATE ... WHERE status = ?`; callers observe a lost race as
//! a `false` return, never as an error.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
