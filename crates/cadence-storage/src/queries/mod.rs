// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD and conditional-update operations on the stores.

pub mod contacts;
pub mod messages;
pub mod reviews;
pub mod schedules;
