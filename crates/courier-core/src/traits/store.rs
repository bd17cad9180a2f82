// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage trait for the message and receipt store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ClaimFilter, ClaimedMessage, DeliveryPlan, DeliveryStats, Group, GroupMode, InboxEntry,
    InboxQuery, Message, Receipt, Topic,
};

/// Durable owner of messages, receipts, and the directory tables that
/// routing and claim eligibility read.
///
/// Every multi-step mutation is a single transaction. Lease operations take
/// `now` from the caller so that expiry is evaluated against one clock
/// reading per call.
#[async_trait]
pub trait DeliveryStore: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), CourierError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), CourierError>;

    // --- Directory ---

    async fn create_topic(&self, id: &str, name: &str) -> Result<Topic, CourierError>;

    async fn get_topic(&self, id: &str) -> Result<Option<Topic>, CourierError>;

    /// Subscribes `agent_id` to a topic. Subscribing twice is a no-op.
    async fn subscribe(&self, topic_id: &str, agent_id: &str) -> Result<(), CourierError>;

    /// Returns whether a subscription was removed.
    async fn unsubscribe(&self, topic_id: &str, agent_id: &str) -> Result<bool, CourierError>;

    async fn list_subscribers(&self, topic_id: &str) -> Result<Vec<String>, CourierError>;

    async fn create_group(
        &self,
        id: &str,
        name: &str,
        mode: GroupMode,
    ) -> Result<Group, CourierError>;

    async fn get_group(&self, id: &str) -> Result<Option<Group>, CourierError>;

    /// Adds `agent_id` to a group. Adding twice is a no-op.
    async fn add_member(&self, group_id: &str, agent_id: &str) -> Result<(), CourierError>;

    /// Returns whether a membership was removed.
    async fn remove_member(&self, group_id: &str, agent_id: &str) -> Result<bool, CourierError>;

    async fn list_members(&self, group_id: &str) -> Result<Vec<String>, CourierError>;

    // --- Messages ---

    /// Persists a message and every receipt in `plan` in one transaction.
    async fn create_message(
        &self,
        message: &Message,
        plan: &DeliveryPlan,
    ) -> Result<(), CourierError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, CourierError>;

    /// Lists the agent's receipts with their messages, newest first.
    async fn list_inbox(
        &self,
        agent_id: &str,
        query: &InboxQuery,
    ) -> Result<Vec<InboxEntry>, CourierError>;

    async fn list_receipts(&self, message_id: &str) -> Result<Vec<Receipt>, CourierError>;

    /// Messages whose `reply_to` is `message_id`, oldest first.
    async fn list_replies(&self, message_id: &str) -> Result<Vec<Message>, CourierError>;

    // --- Leases ---

    /// Leases up to `limit` pending receipts addressable by `agent_id`.
    ///
    /// Each lease is taken by a conditional write that re-checks eligibility;
    /// a candidate lost to a concurrent claimant is skipped, not retried.
    async fn claim(
        &self,
        agent_id: &str,
        limit: usize,
        filter: &ClaimFilter,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClaimedMessage>, CourierError>;

    /// Resolves a lease as delivered (or read). Fails with `ClaimNotFound`.
    async fn ack(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        mark_read: bool,
        now: DateTime<Utc>,
    ) -> Result<(), CourierError>;

    /// Releases a lease, recording `reason`. Fails with `ClaimNotFound`.
    async fn nack(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CourierError>;

    /// Extends an active lease and returns the new expiry. Fails with `ClaimNotFound`.
    async fn renew(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, CourierError>;

    // --- Expiry ---

    /// Expires pending receipts of messages past their deadline and deletes
    /// those messages. Returns the number of deleted messages.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, CourierError>;

    async fn delivery_stats(&self, now: DateTime<Utc>) -> Result<DeliveryStats, CourierError>;
}
