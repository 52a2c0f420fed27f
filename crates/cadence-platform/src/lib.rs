// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`MessagingPlatform`](cadence_core::MessagingPlatform) implementation
//! backed by an HTTP bridge to the real messaging platform.

pub mod client;
pub mod types;

pub use client::PlatformClient;
