// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lease transitions on receipts: claim, ack, nack, renew.
//!
//! Every transition is a single conditional UPDATE whose WHERE clause
//! restates the full precondition (pending, lease state, token, addressee).
//! A transition whose precondition no longer holds changes zero rows; that is
//! how a losing claimant or a stale token is detected. Transactions are
//! IMMEDIATE so that candidate selection and the write see the same snapshot
//! even when several connections share the database file.

use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_core::CourierError;
use courier_core::types::{ClaimFilter, ClaimedMessage};
use rusqlite::{OptionalExtension, TransactionBehavior, named_params};
use tracing::debug;
use uuid::Uuid;

use crate::database::{Database, map_tr_err};
use crate::models::encode_ts;
use crate::queries::messages::fetch_message;

/// Receipts the agent may lease right now, oldest message first.
const CANDIDATES_SQL: &str = "
    SELECT r.id
    FROM receipts r
    JOIN messages m ON m.id = r.message_id
    WHERE r.status = 'pending'
      AND (r.lease_expires_at IS NULL OR r.lease_expires_at <= :now)
      AND (m.expires_at IS NULL OR m.expires_at > :now)
      AND (
            (r.queue_group_id IS NULL AND r.recipient_id = :agent)
         OR (r.queue_group_id IS NOT NULL AND EXISTS (
                SELECT 1 FROM group_members gm
                WHERE gm.group_id = r.queue_group_id AND gm.agent_id = :agent))
      )
      AND (:topic IS NULL OR m.topic_id = :topic)
      AND (:sender IS NULL OR m.sender_id = :sender)
      AND (:priority IS NULL OR m.priority = :priority)
    ORDER BY m.created_at ASC, r.id ASC
    LIMIT :limit";

/// Take the lease on one candidate if it is still eligible.
/// Queue receipts record the claimant in `recipient_id`.
const TAKE_LEASE_SQL: &str = "
    UPDATE receipts
    SET lease_token = :token,
        lease_expires_at = :expires,
        attempts = attempts + 1,
        last_claimed_at = :now,
        last_error = NULL,
        recipient_id = CASE WHEN queue_group_id IS NULL THEN recipient_id ELSE :agent END
    WHERE id = :id
      AND status = 'pending'
      AND (lease_expires_at IS NULL OR lease_expires_at <= :now)
      AND (
            (queue_group_id IS NULL AND recipient_id = :agent)
         OR (queue_group_id IS NOT NULL AND EXISTS (
                SELECT 1 FROM group_members gm
                WHERE gm.group_id = receipts.queue_group_id AND gm.agent_id = :agent))
      )
      AND EXISTS (
            SELECT 1 FROM messages m
            WHERE m.id = receipts.message_id
              AND (m.expires_at IS NULL OR m.expires_at > :now))
    RETURNING message_id, attempts";

/// Shared precondition for ack, nack, and renew.
const HELD_LEASE: &str = "message_id = :message_id
      AND recipient_id = :agent
      AND lease_token = :token
      AND status = 'pending'
      AND lease_expires_at > :now";

/// `now + lease`, rejecting leases that overflow the representable time range.
fn lease_expiry(now: DateTime<Utc>, lease: Duration) -> Result<DateTime<Utc>, CourierError> {
    chrono::Duration::from_std(lease)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| CourierError::Validation(format!("lease of {lease:?} is out of range")))
}

/// Lease up to `limit` pending receipts addressable by `agent_id`.
///
/// Returns fewer than `limit` entries (possibly none) when fewer are eligible
/// or when a concurrent claimant wins a candidate first.
pub async fn claim(
    db: &Database,
    agent_id: &str,
    limit: usize,
    filter: &ClaimFilter,
    lease: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<ClaimedMessage>, CourierError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let expires_at = lease_expiry(now, lease)?;

    let agent = agent_id.to_string();
    let topic = filter.topic_id.clone();
    let sender = filter.sender_id.clone();
    let priority = filter.priority.map(|p| p.to_string());
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let now_ts = encode_ts(now);
    let expires_ts = encode_ts(expires_at);

    let claimed = db
        .connection()
        .call(move |conn| -> Result<Vec<ClaimedMessage>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let candidates: Vec<i64> = {
                let mut stmt = tx.prepare(CANDIDATES_SQL)?;
                let rows = stmt.query_map(
                    named_params! {
                        ":now": now_ts,
                        ":agent": agent,
                        ":topic": topic,
                        ":sender": sender,
                        ":priority": priority,
                        ":limit": limit,
                    },
                    |row| row.get(0),
                )?;
                rows.collect::<Result<_, _>>()?
            };

            let mut claimed = Vec::with_capacity(candidates.len());
            {
                let mut take = tx.prepare(TAKE_LEASE_SQL)?;
                for receipt_id in candidates {
                    let token = Uuid::new_v4().to_string();
                    let won: Option<(String, u32)> = take
                        .query_row(
                            named_params! {
                                ":id": receipt_id,
                                ":token": token,
                                ":expires": expires_ts,
                                ":now": now_ts,
                                ":agent": agent,
                            },
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?;
                    // Lost to another claimant: skip, never retry.
                    let Some((message_id, attempts)) = won else {
                        continue;
                    };
                    if let Some(message) = fetch_message(&tx, &message_id)? {
                        claimed.push(ClaimedMessage {
                            message,
                            receipt_id,
                            token,
                            expires_at,
                            attempts,
                        });
                    }
                }
            }

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)?;

    debug!(agent_id, claimed = claimed.len(), "claim");
    Ok(claimed)
}

/// Resolve a held lease as delivered, or as read when `mark_read` is set,
/// and advance the message's aggregate status in the same transaction.
pub async fn ack(
    db: &Database,
    message_id: &str,
    agent_id: &str,
    token: &str,
    mark_read: bool,
    now: DateTime<Utc>,
) -> Result<(), CourierError> {
    let message_id = message_id.to_string();
    let agent = agent_id.to_string();
    let token = token.to_string();
    let now_ts = encode_ts(now);

    let resolved = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(
                &format!(
                    "UPDATE receipts
                     SET status = CASE WHEN :read THEN 'read' ELSE 'delivered' END,
                         lease_token = NULL,
                         lease_expires_at = NULL,
                         delivered_at = COALESCE(delivered_at, :now),
                         read_at = CASE WHEN :read THEN COALESCE(read_at, :now) ELSE read_at END
                     WHERE {HELD_LEASE}"
                ),
                named_params! {
                    ":read": mark_read,
                    ":now": now_ts,
                    ":message_id": message_id,
                    ":agent": agent,
                    ":token": token,
                },
            )?;
            if changed == 0 {
                return Ok(false);
            }
            // Aggregate status only moves forward: pending -> delivered -> read.
            tx.execute(
                "UPDATE messages
                 SET status = CASE WHEN :read OR status = 'read' THEN 'read' ELSE 'delivered' END,
                     delivered_at = COALESCE(delivered_at, :now),
                     read_at = CASE WHEN :read THEN COALESCE(read_at, :now) ELSE read_at END
                 WHERE id = :message_id",
                named_params! {
                    ":read": mark_read,
                    ":now": now_ts,
                    ":message_id": message_id,
                },
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if resolved {
        Ok(())
    } else {
        Err(CourierError::ClaimNotFound)
    }
}

/// Release a held lease without resolving the receipt. The receipt becomes
/// claimable again immediately; a queue receipt returns to its group.
pub async fn nack(
    db: &Database,
    message_id: &str,
    agent_id: &str,
    token: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), CourierError> {
    let message_id = message_id.to_string();
    let agent = agent_id.to_string();
    let token = token.to_string();
    let reason = reason.map(str::to_string);
    let now_ts = encode_ts(now);

    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                &format!(
                    "UPDATE receipts
                     SET lease_token = NULL,
                         lease_expires_at = NULL,
                         last_error = :reason,
                         recipient_id = CASE WHEN queue_group_id IS NULL THEN recipient_id ELSE NULL END
                     WHERE {HELD_LEASE}"
                ),
                named_params! {
                    ":reason": reason,
                    ":now": now_ts,
                    ":message_id": message_id,
                    ":agent": agent,
                    ":token": token,
                },
            )
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(CourierError::ClaimNotFound);
    }
    Ok(())
}

/// Extend a held lease to `now + lease`. Returns the new expiry.
pub async fn renew(
    db: &Database,
    message_id: &str,
    agent_id: &str,
    token: &str,
    lease: Duration,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, CourierError> {
    let expires_at = lease_expiry(now, lease)?;
    let message_id = message_id.to_string();
    let agent = agent_id.to_string();
    let token = token.to_string();
    let now_ts = encode_ts(now);
    let expires_ts = encode_ts(expires_at);

    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                &format!("UPDATE receipts SET lease_expires_at = :expires WHERE {HELD_LEASE}"),
                named_params! {
                    ":expires": expires_ts,
                    ":now": now_ts,
                    ":message_id": message_id,
                    ":agent": agent,
                    ":token": token,
                },
            )
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(CourierError::ClaimNotFound);
    }
    Ok(expires_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;
    use courier_core::types::{
        DeliveryPlan, GroupMode, Message, Priority, ReceiptStatus, ReceiptTarget,
    };
    use tempfile::tempdir;

    use crate::queries::directory::{add_member, create_group, remove_member};
    use crate::queries::messages::tests::{direct_message, plan_for};
    use crate::queries::messages::{create_message, get_message, list_receipts};

    const LEASE: Duration = Duration::from_secs(30);

    fn t0() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    async fn seed_direct(db: &Database, id: &str, to: &str, at: DateTime<Utc>) {
        let msg = direct_message(id, to, at);
        create_message(db, &msg, &plan_for(&[to])).await.unwrap();
    }

    async fn seed_queue(db: &Database, id: &str, group: &str, at: DateTime<Utc>) -> Message {
        let mut msg = direct_message(id, "unused", at);
        msg.to_agent_id = None;
        msg.group_id = Some(group.to_string());
        msg.queue_mode = true;
        let plan = DeliveryPlan {
            recipients: vec![],
            queue_group: Some(group.to_string()),
        };
        create_message(db, &msg, &plan).await.unwrap();
        msg
    }

    async fn queue_group(db: &Database, members: &[&str]) {
        create_group(db, "workers", "Workers", GroupMode::Queue)
            .await
            .unwrap();
        for m in members {
            add_member(db, "workers", m).await.unwrap();
        }
    }

    #[tokio::test]
    async fn claim_is_oldest_first_and_respects_limit() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "second", "bob", now - secs(5)).await;
        seed_direct(&db, "first", "bob", now - secs(10)).await;
        seed_direct(&db, "third", "bob", now - secs(1)).await;

        let batch = claim(&db, "bob", 2, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        let ids: Vec<_> = batch.iter().map(|c| c.message.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!(batch.iter().all(|c| c.attempts == 1));
        assert!(batch.iter().all(|c| c.expires_at == now + secs(30)));
        assert_ne!(batch[0].token, batch[1].token);

        let rest = claim(&db, "bob", 10, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].message.id, "third");
    }

    #[tokio::test]
    async fn claim_only_sees_own_receipts() {
        let db = Database::open_in_memory().await.unwrap();
        seed_direct(&db, "m1", "bob", t0()).await;

        let other = claim(&db, "mallory", 10, &ClaimFilter::default(), LEASE, t0())
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn leased_receipt_is_invisible_until_lease_lapses() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;

        let first = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let during = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now + secs(29))
            .await
            .unwrap();
        assert!(during.is_empty());

        let after = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now + secs(30))
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_ne!(after[0].token, first[0].token);
        assert_eq!(after[0].attempts, 2);

        // The superseded token can no longer resolve the receipt.
        let stale = ack(&db, "m1", "bob", &first[0].token, false, now + secs(31)).await;
        assert!(matches!(stale, Err(CourierError::ClaimNotFound)));
        ack(&db, "m1", "bob", &after[0].token, false, now + secs(31))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn zero_limit_claims_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        seed_direct(&db, "m1", "bob", t0()).await;
        let batch = claim(&db, "bob", 0, &ClaimFilter::default(), LEASE, t0())
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn ack_resolves_receipt_and_mirrors_message() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;
        let claimed = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();

        ack(&db, "m1", "bob", &claimed[0].token, true, now + secs(1))
            .await
            .unwrap();

        let receipt = &list_receipts(&db, "m1").await.unwrap()[0];
        assert_eq!(receipt.status, ReceiptStatus::Read);
        assert!(receipt.lease.is_none());
        assert_eq!(receipt.delivered_at, Some(now + secs(1)));
        assert_eq!(receipt.read_at, Some(now + secs(1)));

        let message = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(message.status, ReceiptStatus::Read);
        assert_eq!(message.read_at, Some(now + secs(1)));

        // A second ack with the same token finds nothing to resolve.
        let again = ack(&db, "m1", "bob", &claimed[0].token, true, now + secs(2)).await;
        assert!(matches!(again, Err(CourierError::ClaimNotFound)));
    }

    #[tokio::test]
    async fn ack_rejects_wrong_token_agent_and_expired_lease() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;
        let claimed = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        let token = &claimed[0].token;

        let wrong_token = ack(&db, "m1", "bob", "not-a-token", false, now).await;
        assert!(matches!(wrong_token, Err(CourierError::ClaimNotFound)));

        let wrong_agent = ack(&db, "m1", "mallory", token, false, now).await;
        assert!(matches!(wrong_agent, Err(CourierError::ClaimNotFound)));

        let expired = ack(&db, "m1", "bob", token, false, now + secs(30)).await;
        assert!(matches!(expired, Err(CourierError::ClaimNotFound)));

        let receipt = &list_receipts(&db, "m1").await.unwrap()[0];
        assert_eq!(receipt.status, ReceiptStatus::Pending);
    }

    #[tokio::test]
    async fn delivered_then_read_keeps_first_delivery_time() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        let msg = direct_message("m1", "bob", now);
        create_message(&db, &msg, &plan_for(&["bob", "carol"]))
            .await
            .unwrap();

        let bob = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        ack(&db, "m1", "bob", &bob[0].token, false, now + secs(1))
            .await
            .unwrap();
        let message = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(message.status, ReceiptStatus::Delivered);
        assert!(message.read_at.is_none());

        let carol = claim(&db, "carol", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        ack(&db, "m1", "carol", &carol[0].token, true, now + secs(2))
            .await
            .unwrap();
        let message = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(message.status, ReceiptStatus::Read);
        assert_eq!(message.delivered_at, Some(now + secs(1)));
        assert_eq!(message.read_at, Some(now + secs(2)));
    }

    #[tokio::test]
    async fn nack_releases_immediately_and_records_reason() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;
        let first = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();

        nack(&db, "m1", "bob", &first[0].token, Some("handler crashed"), now)
            .await
            .unwrap();
        let receipt = &list_receipts(&db, "m1").await.unwrap()[0];
        assert!(receipt.lease.is_none());
        assert_eq!(receipt.last_error.as_deref(), Some("handler crashed"));

        let later = now + secs(1);
        let again = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, later)
            .await
            .unwrap();
        assert_eq!(again.len(), 1);
        assert_ne!(again[0].token, first[0].token);
        assert_eq!(again[0].attempts, 2);

        let receipt = &list_receipts(&db, "m1").await.unwrap()[0];
        assert_eq!(receipt.last_claimed_at, Some(later));
        assert_eq!(receipt.last_error, None, "a fresh claim starts without a failure reason");

        let stale = nack(&db, "m1", "bob", &first[0].token, None, now).await;
        assert!(matches!(stale, Err(CourierError::ClaimNotFound)));
    }

    #[tokio::test]
    async fn claim_stamps_last_claimed_at() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;
        claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();

        let receipt = &list_receipts(&db, "m1").await.unwrap()[0];
        assert_eq!(receipt.last_claimed_at, Some(now));
        assert_eq!(receipt.attempts, 1);
        assert!(receipt.last_error.is_none());
    }

    #[tokio::test]
    async fn overflowing_lease_is_a_validation_error() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;
        let huge = Duration::from_secs(10_000_000_000_000);

        let err = claim(&db, "bob", 1, &ClaimFilter::default(), huge, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));

        let claimed = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        let err = renew(&db, "m1", "bob", &claimed[0].token, huge, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));
    }

    #[tokio::test]
    async fn renew_extends_only_an_active_lease() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        seed_direct(&db, "m1", "bob", now).await;
        let claimed = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        let token = claimed[0].token.clone();

        let new_expiry = renew(&db, "m1", "bob", &token, LEASE, now + secs(20))
            .await
            .unwrap();
        assert_eq!(new_expiry, now + secs(50));

        // Past the original expiry but inside the renewed one.
        let hidden = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now + secs(40))
            .await
            .unwrap();
        assert!(hidden.is_empty());

        let lapsed = renew(&db, "m1", "bob", &token, LEASE, now + secs(50)).await;
        assert!(matches!(lapsed, Err(CourierError::ClaimNotFound)));
    }

    #[tokio::test]
    async fn expired_messages_cannot_be_claimed() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        let mut msg = direct_message("m1", "bob", now - secs(10));
        msg.expires_at = Some(now);
        create_message(&db, &msg, &plan_for(&["bob"])).await.unwrap();

        let batch = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert!(batch.is_empty());

        let before = claim(&db, "bob", 1, &ClaimFilter::default(), LEASE, now - secs(1))
            .await
            .unwrap();
        assert_eq!(before.len(), 1);
    }

    #[tokio::test]
    async fn claim_filter_narrows_candidates() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        let mut urgent = direct_message("urgent", "bob", now - secs(2));
        urgent.priority = Priority::Critical;
        urgent.sender_id = "pager".into();
        create_message(&db, &urgent, &plan_for(&["bob"])).await.unwrap();
        seed_direct(&db, "routine", "bob", now - secs(3)).await;

        let by_priority = ClaimFilter {
            priority: Some(Priority::Critical),
            ..ClaimFilter::default()
        };
        let batch = claim(&db, "bob", 10, &by_priority, LEASE, now).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message.id, "urgent");

        let by_sender = ClaimFilter {
            sender_id: Some("sender".into()),
            ..ClaimFilter::default()
        };
        let batch = claim(&db, "bob", 10, &by_sender, LEASE, now).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message.id, "routine");
    }

    #[tokio::test]
    async fn queue_receipt_goes_to_exactly_one_member() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        queue_group(&db, &["w1", "w2"]).await;
        seed_queue(&db, "job", "workers", now).await;

        let w1 = claim(&db, "w1", 5, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert_eq!(w1.len(), 1);
        let w2 = claim(&db, "w2", 5, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert!(w2.is_empty());

        let receipts = list_receipts(&db, "job").await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(
            receipts[0].target,
            ReceiptTarget::GroupQueue {
                group_id: "workers".into(),
                claimed_by: Some("w1".into())
            }
        );

        // w2 cannot resolve w1's lease even with the right token.
        let hijack = ack(&db, "job", "w2", &w1[0].token, false, now).await;
        assert!(matches!(hijack, Err(CourierError::ClaimNotFound)));
    }

    #[tokio::test]
    async fn queue_receipt_moves_to_another_member_after_lapse() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        queue_group(&db, &["w1", "w2"]).await;
        seed_queue(&db, "job", "workers", now).await;

        let w1 = claim(&db, "w1", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        let later = now + secs(31);
        let w2 = claim(&db, "w2", 1, &ClaimFilter::default(), LEASE, later)
            .await
            .unwrap();
        assert_eq!(w2.len(), 1);
        assert_eq!(w2[0].attempts, 2);

        let stale = ack(&db, "job", "w1", &w1[0].token, false, later).await;
        assert!(matches!(stale, Err(CourierError::ClaimNotFound)));
        ack(&db, "job", "w2", &w2[0].token, false, later).await.unwrap();

        let none = claim(&db, "w1", 1, &ClaimFilter::default(), LEASE, later + secs(60))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn queue_nack_returns_receipt_to_group() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        queue_group(&db, &["w1", "w2"]).await;
        seed_queue(&db, "job", "workers", now).await;

        let w1 = claim(&db, "w1", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        nack(&db, "job", "w1", &w1[0].token, None, now).await.unwrap();

        let receipt = &list_receipts(&db, "job").await.unwrap()[0];
        assert_eq!(receipt.target.agent_id(), None);

        let w2 = claim(&db, "w2", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert_eq!(w2.len(), 1);
    }

    #[tokio::test]
    async fn non_members_cannot_claim_queue_receipts() {
        let db = Database::open_in_memory().await.unwrap();
        let now = t0();
        queue_group(&db, &["w1"]).await;
        seed_queue(&db, "job", "workers", now).await;

        let outsider = claim(&db, "w9", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert!(outsider.is_empty());

        remove_member(&db, "workers", "w1").await.unwrap();
        let removed = claim(&db, "w1", 1, &ClaimFilter::default(), LEASE, now)
            .await
            .unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn concurrent_claims_across_connections_have_one_winner() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("race.db");
        let path = path.to_str().unwrap();

        let seed = Database::open(path).await.unwrap();
        queue_group(&seed, &["w1", "w2", "w3", "w4"]).await;
        let now = t0();
        seed_queue(&seed, "job", "workers", now).await;

        let mut handles = Vec::new();
        for worker in ["w1", "w2", "w3", "w4"] {
            let db = Database::open(path).await.unwrap();
            handles.push(tokio::spawn(async move {
                claim(&db, worker, 1, &ClaimFilter::default(), LEASE, now).await
            }));
        }

        let mut winners = 0;
        for result in futures::future::join_all(handles).await {
            winners += result.unwrap().unwrap().len();
        }
        assert_eq!(winners, 1);

        let receipt = &list_receipts(&seed, "job").await.unwrap()[0];
        assert_eq!(receipt.attempts, 1);
    }
}
