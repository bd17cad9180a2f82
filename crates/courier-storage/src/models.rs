// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the delivery domain types.
//!
//! The canonical types live in `courier-core`; they are re-exported here.
//! Timestamps are stored as fixed-width UTC text so that string comparison
//! in SQL orders them chronologically.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub use courier_core::types::{
    DeliveryStats, Group, GroupMode, InboxEntry, Lease, Message, Metadata, Priority, Receipt,
    ReceiptStatus, ReceiptTarget, Topic,
};

/// Column list matching [`row_to_message`]. Expects `messages` aliased as `m`.
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.to_agent_id, m.topic_id, \
     m.group_id, m.queue_mode, m.reply_to, m.content, m.content_type, m.priority, m.tags, \
     m.metadata, m.created_at, m.expires_at, m.status, m.delivered_at, m.read_at";

/// Number of columns in [`MESSAGE_COLUMNS`].
pub(crate) const MESSAGE_COLUMN_COUNT: usize = 17;

/// Column list matching [`row_to_receipt`]. Expects `receipts` aliased as `r`.
pub(crate) const RECEIPT_COLUMNS: &str = "r.id, r.message_id, r.recipient_id, \
     r.queue_group_id, r.status, r.lease_token, r.lease_expires_at, r.attempts, \
     r.last_claimed_at, r.last_error, r.delivered_at, r.read_at";

/// Encode a timestamp for storage, e.g. `2026-03-01T12:00:00.000000Z`.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn decode_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_ts(idx, &raw)
}

pub(crate) fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| decode_ts(idx, &raw)).transpose()
}

/// Read a text column holding a strum-encoded enum.
pub(crate) fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = strum::ParseError>,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_json<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map a row selected with [`MESSAGE_COLUMNS`] starting at column `offset`.
pub(crate) fn row_to_message(row: &Row<'_>, offset: usize) -> rusqlite::Result<Message> {
    let o = offset;
    Ok(Message {
        id: row.get(o)?,
        sender_id: row.get(o + 1)?,
        to_agent_id: row.get(o + 2)?,
        topic_id: row.get(o + 3)?,
        group_id: row.get(o + 4)?,
        queue_mode: row.get(o + 5)?,
        reply_to: row.get(o + 6)?,
        content: row.get(o + 7)?,
        content_type: row.get(o + 8)?,
        priority: get_enum(row, o + 9)?,
        tags: get_json(row, o + 10)?,
        metadata: get_json(row, o + 11)?,
        created_at: get_ts(row, o + 12)?,
        expires_at: get_opt_ts(row, o + 13)?,
        status: get_enum(row, o + 14)?,
        delivered_at: get_opt_ts(row, o + 15)?,
        read_at: get_opt_ts(row, o + 16)?,
    })
}

/// Map a row selected with [`RECEIPT_COLUMNS`] starting at column `offset`.
pub(crate) fn row_to_receipt(row: &Row<'_>, offset: usize) -> rusqlite::Result<Receipt> {
    let o = offset;
    let recipient_id: Option<String> = row.get(o + 2)?;
    let queue_group_id: Option<String> = row.get(o + 3)?;
    let target = match (queue_group_id, recipient_id) {
        (Some(group_id), claimed_by) => ReceiptTarget::GroupQueue {
            group_id,
            claimed_by,
        },
        (None, Some(agent_id)) => ReceiptTarget::Agent(agent_id),
        (None, None) => {
            return Err(rusqlite::Error::InvalidColumnType(
                o + 2,
                "recipient_id".to_string(),
                Type::Null,
            ));
        }
    };

    let token: Option<String> = row.get(o + 5)?;
    let expires_at = get_opt_ts(row, o + 6)?;
    let lease = match (token, expires_at) {
        (Some(token), Some(expires_at)) => Some(Lease { token, expires_at }),
        _ => None,
    };

    Ok(Receipt {
        id: row.get(o)?,
        message_id: row.get(o + 1)?,
        target,
        status: get_enum(row, o + 4)?,
        lease,
        attempts: row.get(o + 7)?,
        last_claimed_at: get_opt_ts(row, o + 8)?,
        last_error: row.get(o + 9)?,
        delivered_at: get_opt_ts(row, o + 10)?,
        read_at: get_opt_ts(row, o + 11)?,
    })
}

pub(crate) fn row_to_topic(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: get_ts(row, 2)?,
    })
}

pub(crate) fn row_to_group(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        mode: get_enum(row, 2)?,
        created_at: get_ts(row, 3)?,
    })
}
