// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory in-process notification queue for newly routed messages.
//!
//! Bounded and non-blocking: when the queue is full (or nobody is listening)
//! the notification is dropped and counted. Delivery never depends on it.

use std::sync::atomic::{AtomicU64, Ordering};

use courier_core::Message;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Sending side of the notification queue.
#[derive(Debug)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Message>,
    dropped: AtomicU64,
}

impl NotificationQueue {
    /// Create a queue holding at most `capacity` undelivered notifications.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Offer a message to observers. Returns `false` if it was dropped.
    pub fn notify(&self, message: &Message) -> bool {
        match self.tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(message_id = %message.id, "notification queue full, dropping");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(message_id = %message.id, "notification queue closed, dropping");
                false
            }
        }
    }

    /// Notifications dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
