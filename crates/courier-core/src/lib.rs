// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier coordination hub.
//!
//! This crate provides the error type, the delivery domain types, and the
//! adapter traits (store and live-push broker) that the router, the lease
//! coordinator, and the storage backend are written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use types::{
    AdapterType, ClaimFilter, ClaimedMessage, DeliveryPlan, DeliveryStats, Group, GroupMode,
    HealthStatus, InboxEntry, InboxQuery, Lease, Message, MessageDraft, Metadata, Priority,
    Receipt, ReceiptStatus, ReceiptTarget, Topic,
};

pub use traits::{DeliveryStore, LiveBroker, PluginAdapter};
