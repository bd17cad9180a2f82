// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-push broker trait for socket fan-out.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Message;

/// Best-effort "publish now" notifier for connected sockets.
///
/// Called after a message and its receipts are committed. Nothing here
/// contributes to durability: the router logs and discards any error.
#[async_trait]
pub trait LiveBroker: PluginAdapter {
    /// Push a message to everyone listening on a topic.
    async fn publish(&self, topic_id: &str, message: &Message) -> Result<(), CourierError>;

    /// Push a message to a single connected agent.
    async fn send_direct(&self, agent_id: &str, message: &Message) -> Result<(), CourierError>;
}
