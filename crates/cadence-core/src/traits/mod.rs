// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the engine's external seams.
//!
//! The draft generator and the messaging platform are external
//! collaborators; the engine only ever sees them through these traits,
//! using `#[async_trait]` for dynamic dispatch.

pub mod generator;
pub mod platform;

pub use generator::DraftGenerator;
pub use platform::MessagingPlatform;
