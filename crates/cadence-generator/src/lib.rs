// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`DraftGenerator`](cadence_core::DraftGenerator) implementation backed by
//! an HTTP draft-generation service.

pub mod client;
pub mod types;

pub use client::DraftServiceClient;
