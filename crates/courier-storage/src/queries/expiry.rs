// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expiry purge and store-wide counters.

use chrono::{DateTime, Utc};
use courier_core::CourierError;
use courier_core::types::DeliveryStats;
use rusqlite::{TransactionBehavior, named_params};

use crate::database::{Database, map_tr_err};
use crate::models::encode_ts;

/// Expire the pending receipts of every message whose deadline is at or
/// before `now`, then delete those messages (receipts cascade).
///
/// Returns the number of messages deleted. Running it again with the same
/// `now` deletes nothing.
pub async fn purge_expired(db: &Database, now: DateTime<Utc>) -> Result<u64, CourierError> {
    let now_ts = encode_ts(now);
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE receipts
                 SET status = 'expired', lease_token = NULL, lease_expires_at = NULL
                 WHERE status = 'pending'
                   AND message_id IN (
                       SELECT id FROM messages
                       WHERE expires_at IS NOT NULL AND expires_at <= :now)",
                named_params! { ":now": now_ts },
            )?;
            let deleted = tx.execute(
                "DELETE FROM messages WHERE expires_at IS NOT NULL AND expires_at <= :now",
                named_params! { ":now": now_ts },
            )?;
            tx.commit()?;
            Ok(deleted as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Message and receipt counters. A pending receipt counts as leased only
/// while its lease is active at `now`.
pub async fn delivery_stats(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<DeliveryStats, CourierError> {
    let now_ts = encode_ts(now);
    db.connection()
        .call(move |conn| -> Result<DeliveryStats, rusqlite::Error> {
            conn.query_row(
                "SELECT
                     (SELECT COUNT(*) FROM messages),
                     COALESCE(SUM(status = 'pending'
                         AND (lease_expires_at IS NULL OR lease_expires_at <= :now)), 0),
                     COALESCE(SUM(status = 'pending' AND lease_expires_at > :now), 0),
                     COALESCE(SUM(status = 'delivered'), 0),
                     COALESCE(SUM(status = 'read'), 0),
                     COALESCE(SUM(status = 'expired'), 0)
                 FROM receipts",
                named_params! { ":now": now_ts },
                |row| {
                    Ok(DeliveryStats {
                        messages: row.get::<_, i64>(0)? as u64,
                        pending: row.get::<_, i64>(1)? as u64,
                        leased: row.get::<_, i64>(2)? as u64,
                        delivered: row.get::<_, i64>(3)? as u64,
                        read: row.get::<_, i64>(4)? as u64,
                        expired: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}
