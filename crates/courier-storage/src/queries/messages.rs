// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence, inbox listing, and receipt inspection.

use courier_core::CourierError;
use courier_core::types::{DeliveryPlan, InboxEntry, InboxQuery, Message, Receipt};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    MESSAGE_COLUMN_COUNT, MESSAGE_COLUMNS, RECEIPT_COLUMNS, encode_ts, row_to_message,
    row_to_receipt,
};

/// Insert a message and one receipt per planned recipient in a single
/// transaction. Either everything is visible afterwards or nothing is.
pub async fn create_message(
    db: &Database,
    message: &Message,
    plan: &DeliveryPlan,
) -> Result<(), CourierError> {
    let tags = serde_json::to_string(&message.tags)
        .map_err(|e| CourierError::Internal(format!("failed to encode tags: {e}")))?;
    let metadata = serde_json::to_string(&message.metadata)
        .map_err(|e| CourierError::Internal(format!("failed to encode metadata: {e}")))?;
    let msg = message.clone();
    let plan = plan.clone();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, sender_id, to_agent_id, topic_id, group_id,
                 queue_mode, reply_to, content, content_type, priority, tags, metadata,
                 created_at, expires_at, status, delivered_at, read_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    msg.id,
                    msg.sender_id,
                    msg.to_agent_id,
                    msg.topic_id,
                    msg.group_id,
                    msg.queue_mode,
                    msg.reply_to,
                    msg.content,
                    msg.content_type,
                    msg.priority.to_string(),
                    tags,
                    metadata,
                    encode_ts(msg.created_at),
                    msg.expires_at.map(encode_ts),
                    msg.status.to_string(),
                    msg.delivered_at.map(encode_ts),
                    msg.read_at.map(encode_ts),
                ],
            )?;
            {
                let mut insert_receipt = tx.prepare(
                    "INSERT INTO receipts (message_id, recipient_id, queue_group_id)
                     VALUES (?1, ?2, ?3)",
                )?;
                for recipient in &plan.recipients {
                    insert_receipt.execute(params![msg.id, recipient, None::<String>])?;
                }
                if let Some(group_id) = &plan.queue_group {
                    insert_receipt.execute(params![msg.id, None::<String>, group_id])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Load a message by id on an open connection.
pub(crate) fn fetch_message(
    conn: &rusqlite::Connection,
    id: &str,
) -> Result<Option<Message>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1"),
        params![id],
        |row| row_to_message(row, 0),
    )
    .optional()
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> { fetch_message(conn, &id) })
        .await
        .map_err(map_tr_err)
}

/// Receipts held by `agent_id` with their messages, newest message first.
///
/// Queue receipts appear in the inbox of the member that last claimed them.
pub async fn list_inbox(
    db: &Database,
    agent_id: &str,
    query: &InboxQuery,
) -> Result<Vec<InboxEntry>, CourierError> {
    let agent_id = agent_id.to_string();
    let status = query.status.map(|s| s.to_string());
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<InboxEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS}, {RECEIPT_COLUMNS}
                 FROM receipts r JOIN messages m ON m.id = r.message_id
                 WHERE r.recipient_id = ?1 AND (?2 IS NULL OR r.status = ?2)
                 ORDER BY m.created_at DESC, r.id DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![agent_id, status, limit], |row| {
                Ok(InboxEntry {
                    message: row_to_message(row, 0)?,
                    receipt: row_to_receipt(row, MESSAGE_COLUMN_COUNT)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every receipt of a message in creation order.
pub async fn list_receipts(db: &Database, message_id: &str) -> Result<Vec<Receipt>, CourierError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Receipt>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECEIPT_COLUMNS} FROM receipts r WHERE r.message_id = ?1 ORDER BY r.id ASC"
            ))?;
            let rows = stmt.query_map(params![message_id], |row| row_to_receipt(row, 0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replies to a message, oldest first.
pub async fn list_replies(db: &Database, message_id: &str) -> Result<Vec<Message>, CourierError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.reply_to = ?1
                 ORDER BY m.created_at ASC, m.id ASC"
            ))?;
            let rows = stmt.query_map(params![message_id], |row| row_to_message(row, 0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
