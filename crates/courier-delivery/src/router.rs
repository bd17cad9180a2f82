// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery router: resolves who receives a message and persists it with
//! one receipt per recipient.
//!
//! Recipient resolution reads the directory at send time, before and outside
//! the transaction that writes the message and its receipts. The recipient
//! set is that snapshot: subscribers or members that join later do not
//! receive earlier messages.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use courier_config::model::DeliveryConfig;
use courier_core::{
    CourierError, DeliveryPlan, DeliveryStore, GroupMode, LiveBroker, Message, MessageDraft,
    ReceiptStatus,
};
use tracing::{debug, info, warn};

use crate::notify::NotificationQueue;

/// Content type applied when a draft does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Routes message drafts into persisted messages and receipts.
pub struct DeliveryRouter {
    store: Arc<dyn DeliveryStore>,
    broker: Option<Arc<dyn LiveBroker>>,
    notifications: Option<Arc<NotificationQueue>>,
    default_ttl: Option<Duration>,
}

/// Recipients resolved for a draft, plus the facts the push step needs.
struct Resolution {
    plan: DeliveryPlan,
    queue_mode: bool,
    /// Members of a fan-out group, for per-member live pushes.
    fanout_members: Vec<String>,
}

impl DeliveryRouter {
    pub fn new(store: Arc<dyn DeliveryStore>, config: &DeliveryConfig) -> Self {
        Self {
            store,
            broker: None,
            notifications: None,
            default_ttl: config.default_ttl_secs.map(Duration::from_secs),
        }
    }

    /// Attach a best-effort live-push broker.
    pub fn with_broker(mut self, broker: Arc<dyn LiveBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Attach the advisory notification queue.
    pub fn with_notifications(mut self, queue: Arc<NotificationQueue>) -> Self {
        self.notifications = Some(queue);
        self
    }

    /// Validate, resolve, and persist a draft.
    ///
    /// The message and all of its receipts are committed in one transaction
    /// before any live push or notification happens. Failures of those later
    /// steps are logged and never surface to the caller.
    pub async fn route(&self, draft: MessageDraft) -> Result<Message, CourierError> {
        validate(&draft)?;
        let resolution = self.resolve(&draft).await?;

        let created_at = Utc::now().trunc_subsecs(6);
        let ttl = draft.ttl.or(self.default_ttl);
        let expires_at = match ttl {
            Some(ttl) => {
                let expires_at = chrono::Duration::from_std(ttl)
                    .ok()
                    .and_then(|delta| created_at.checked_add_signed(delta))
                    .ok_or_else(|| {
                        CourierError::Validation(format!("ttl of {ttl:?} is out of range"))
                    })?;
                Some(expires_at)
            }
            None => None,
        };

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: draft.sender_id,
            to_agent_id: draft.to_agent_id,
            topic_id: draft.topic_id,
            group_id: draft.group_id,
            queue_mode: resolution.queue_mode,
            reply_to: draft.reply_to,
            content: draft.content,
            content_type: draft
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            priority: draft.priority,
            tags: draft.tags,
            metadata: draft.metadata,
            created_at,
            expires_at,
            status: ReceiptStatus::Pending,
            delivered_at: None,
            read_at: None,
        };

        self.store.create_message(&message, &resolution.plan).await?;
        info!(
            message_id = %message.id,
            sender = %message.sender_id,
            receipts = resolution.plan.receipt_count(),
            queue_mode = message.queue_mode,
            "message routed"
        );

        self.push_live(&message, &resolution.fanout_members).await;
        if let Some(queue) = &self.notifications {
            queue.notify(&message);
        }
        Ok(message)
    }

    async fn resolve(&self, draft: &MessageDraft) -> Result<Resolution, CourierError> {
        let mut recipients = Recipients::default();
        let mut queue_group = None;
        let mut fanout_members = Vec::new();
        let mut queue_mode = false;

        if let Some(agent_id) = &draft.to_agent_id {
            recipients.push(agent_id);
        }

        if let Some(topic_id) = &draft.topic_id {
            if self.store.get_topic(topic_id).await?.is_none() {
                return Err(CourierError::not_found("topic", topic_id.as_str()));
            }
            for agent_id in self.store.list_subscribers(topic_id).await? {
                recipients.push(&agent_id);
            }
        }

        if let Some(group_id) = &draft.group_id {
            let group = self
                .store
                .get_group(group_id)
                .await?
                .ok_or_else(|| CourierError::not_found("group", group_id.as_str()))?;
            match group.mode {
                // The group's own mode wins over the draft's flag.
                GroupMode::Queue => {
                    queue_mode = true;
                    queue_group = Some(group.id);
                }
                GroupMode::Fanout if draft.queue_mode => {
                    return Err(CourierError::Validation(format!(
                        "queue delivery requested but group {group_id} is a fanout group"
                    )));
                }
                GroupMode::Fanout => {
                    fanout_members = self.store.list_members(group_id).await?;
                    for agent_id in &fanout_members {
                        recipients.push(agent_id);
                    }
                }
            }
        }

        let plan = DeliveryPlan {
            recipients: recipients.into_vec(),
            queue_group,
        };
        if plan.receipt_count() == 0 {
            debug!("message resolved to no recipients");
        }
        Ok(Resolution {
            plan,
            queue_mode,
            fanout_members,
        })
    }

    /// One push per distinct target: the topic, the direct agent, and each
    /// fan-out member not already pushed to directly.
    async fn push_live(&self, message: &Message, fanout_members: &[String]) {
        let Some(broker) = &self.broker else {
            return;
        };

        if let Some(topic_id) = &message.topic_id
            && let Err(e) = broker.publish(topic_id, message).await
        {
            warn!(message_id = %message.id, topic_id = %topic_id, error = %e, "live publish failed");
        }

        let mut sent = HashSet::new();
        let direct = message.to_agent_id.iter();
        for agent_id in direct.chain(fanout_members) {
            if !sent.insert(agent_id.as_str()) {
                continue;
            }
            if let Err(e) = broker.send_direct(agent_id, message).await {
                warn!(message_id = %message.id, agent_id = %agent_id, error = %e, "live direct push failed");
            }
        }
    }
}

/// Reject drafts that can never be routed, before touching storage.
fn validate(draft: &MessageDraft) -> Result<(), CourierError> {
    if draft.sender_id.trim().is_empty() {
        return Err(CourierError::Validation("sender id is required".into()));
    }
    if draft.to_agent_id.is_none() && draft.topic_id.is_none() && draft.group_id.is_none() {
        return Err(CourierError::Validation(
            "message needs a recipient, topic, or group".into(),
        ));
    }
    if draft.queue_mode && draft.group_id.is_none() {
        return Err(CourierError::Validation(
            "queue delivery requires a group".into(),
        ));
    }
    for (field, value) in [
        ("to_agent_id", &draft.to_agent_id),
        ("topic_id", &draft.topic_id),
        ("group_id", &draft.group_id),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(CourierError::Validation(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

/// Ordered, de-duplicated recipient list.
#[derive(Default)]
struct Recipients {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl Recipients {
    fn push(&mut self, agent_id: &str) {
        if self.seen.insert(agent_id.to_string()) {
            self.ordered.push(agent_id.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}
