// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable mock implementations of the external seams, shared across the
//! workspace's test suites. Not compiled into release artifacts.

mod mock_generator;
mod mock_platform;

pub use mock_generator::MockGenerator;
pub use mock_platform::MockPlatform;
