// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery engine for the Courier coordination hub.
//!
//! - [`DeliveryRouter`] turns drafts into persisted messages and receipts.
//! - [`LeaseCoordinator`] serves claim, ack, nack, and renew.
//! - [`ExpirySweeper`] purges expired messages.
//! - [`NotificationQueue`] is the advisory in-process feed of routed messages.
//!
//! All of them work against an `Arc<dyn DeliveryStore>`.

pub mod coordinator;
pub mod notify;
pub mod router;
pub mod sweeper;

pub use coordinator::LeaseCoordinator;
pub use notify::NotificationQueue;
pub use router::DeliveryRouter;
pub use sweeper::ExpirySweeper;
