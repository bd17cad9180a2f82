// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - full delivery engine over a temp SQLite database
//! - [`MockBroker`] - live-push broker that records every push

pub mod harness;
pub mod mock_broker;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_broker::{MockBroker, Push};
