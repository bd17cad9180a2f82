// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery domain types shared by the store, the router, and the lease coordinator.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Free-form message metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter plugged into the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Broker,
}

/// Message priority. Ordered from least to most urgent.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Delivery state of a receipt, mirrored onto its message in aggregate.
///
/// A lease is not a status: a leased receipt stays `Pending` for the whole
/// lease lifetime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReceiptStatus {
    #[default]
    Pending,
    Delivered,
    Read,
    Expired,
}

/// How a group distributes messages addressed to it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupMode {
    /// One receipt per member at send time.
    #[default]
    Fanout,
    /// One ownerless receipt; the first member to claim it takes it.
    Queue,
}

/// A persisted message with routing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub to_agent_id: Option<String>,
    pub topic_id: Option<String>,
    pub group_id: Option<String>,
    pub queue_mode: bool,
    pub reply_to: Option<String>,
    pub content: String,
    pub content_type: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Aggregate of the message's receipts. Advances pending -> delivered -> read.
    pub status: ReceiptStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether the message's expiry deadline has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A message as submitted by a producer, before routing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDraft {
    pub sender_id: String,
    pub to_agent_id: Option<String>,
    pub topic_id: Option<String>,
    pub group_id: Option<String>,
    pub queue_mode: bool,
    pub reply_to: Option<String>,
    pub content: String,
    pub content_type: Option<String>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    /// Time to live; `None` falls back to the configured default, if any.
    pub ttl: Option<Duration>,
}

impl MessageDraft {
    /// Start a draft from `sender_id` carrying `content`. Addressing is added
    /// with [`to_agent`](Self::to_agent), [`topic`](Self::topic), or [`group`](Self::group).
    pub fn new(sender_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn to_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.to_agent_id = Some(agent_id.into());
        self
    }

    pub fn topic(mut self, topic_id: impl Into<String>) -> Self {
        self.topic_id = Some(topic_id.into());
        self
    }

    pub fn group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Request queue-mode delivery. Only valid together with a queue-mode group.
    pub fn queue(mut self) -> Self {
        self.queue_mode = true;
        self
    }

    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// The recipients resolved for one message, persisted together with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryPlan {
    /// Individual recipients, de-duplicated, in resolution order.
    pub recipients: Vec<String>,
    /// Queue-mode group owed a single ownerless receipt.
    pub queue_group: Option<String>,
}

impl DeliveryPlan {
    /// Number of receipts this plan produces.
    pub fn receipt_count(&self) -> usize {
        self.recipients.len() + usize::from(self.queue_group.is_some())
    }
}

/// Who a receipt is owed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptTarget {
    /// Assigned to a single agent at send time.
    Agent(String),
    /// Owed to a queue-mode group. `claimed_by` is the member holding (or last
    /// holding) the lease; any current member may take over once the lease lapses.
    GroupQueue {
        group_id: String,
        claimed_by: Option<String>,
    },
}

impl ReceiptTarget {
    /// The agent currently associated with the receipt, if any.
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Self::Agent(id) => Some(id),
            Self::GroupQueue { claimed_by, .. } => claimed_by.as_deref(),
        }
    }
}

/// A time-boxed, token-identified exclusive claim on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Per-recipient delivery state for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub message_id: String,
    pub target: ReceiptTarget,
    pub status: ReceiptStatus,
    pub lease: Option<Lease>,
    pub attempts: u32,
    pub last_claimed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Optional narrowing of claim candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimFilter {
    pub topic_id: Option<String>,
    pub sender_id: Option<String>,
    pub priority: Option<Priority>,
}

/// A receipt successfully leased by a claim call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedMessage {
    pub message: Message,
    pub receipt_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

/// A topic that agents subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A named set of agents with a distribution mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub mode: GroupMode,
    pub created_at: DateTime<Utc>,
}

/// Parameters for listing an agent's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxQuery {
    pub status: Option<ReceiptStatus>,
    pub limit: usize,
}

impl Default for InboxQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
        }
    }
}

/// One inbox row: a message and the caller's receipt for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub message: Message,
    pub receipt: Receipt,
}

/// Counters over the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub messages: u64,
    /// Pending receipts without an active lease.
    pub pending: u64,
    /// Pending receipts under an active lease.
    pub leased: u64,
    pub delivered: u64,
    pub read: u64,
    pub expired: u64,
}
