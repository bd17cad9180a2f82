// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the pluggable edges of the delivery engine.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod broker;
pub mod store;

pub use adapter::PluginAdapter;
pub use broker::LiveBroker;
pub use store::DeliveryStore;
