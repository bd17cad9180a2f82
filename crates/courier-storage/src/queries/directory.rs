// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topics, subscriptions, groups, and group membership.

use chrono::Utc;
use courier_core::CourierError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_call_err, map_tr_err, sqlite_err};
use crate::models::{Group, GroupMode, Topic, encode_ts, row_to_group, row_to_topic};

/// Create a topic. Fails with `Validation` if the id is taken.
pub async fn create_topic(db: &Database, id: &str, name: &str) -> Result<Topic, CourierError> {
    let topic = Topic {
        id: id.to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    let row = topic.clone();
    db.connection()
        .call(move |conn| -> Result<(), CourierError> {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO topics (id, name, created_at) VALUES (?1, ?2, ?3)",
                    params![row.id, row.name, encode_ts(row.created_at)],
                )
                .map_err(sqlite_err)?;
            if inserted == 0 {
                return Err(CourierError::Validation(format!(
                    "topic {} already exists",
                    row.id
                )));
            }
            Ok(())
        })
        .await
        .map_err(map_call_err)?;
    Ok(topic)
}

pub async fn get_topic(db: &Database, id: &str) -> Result<Option<Topic>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Topic>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, name, created_at FROM topics WHERE id = ?1",
                params![id],
                row_to_topic,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Subscribe an agent to a topic. Idempotent.
pub async fn subscribe(db: &Database, topic_id: &str, agent_id: &str) -> Result<(), CourierError> {
    let topic_id = topic_id.to_string();
    let agent_id = agent_id.to_string();
    let now = encode_ts(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), CourierError> {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO subscriptions (topic_id, agent_id, created_at)
                     SELECT id, ?2, ?3 FROM topics WHERE id = ?1",
                    params![topic_id, agent_id, now],
                )
                .map_err(sqlite_err)?;
            if inserted == 0 && !exists(conn, "topics", &topic_id)? {
                return Err(CourierError::not_found("topic", topic_id));
            }
            Ok(())
        })
        .await
        .map_err(map_call_err)
}

pub async fn unsubscribe(
    db: &Database,
    topic_id: &str,
    agent_id: &str,
) -> Result<bool, CourierError> {
    let topic_id = topic_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM subscriptions WHERE topic_id = ?1 AND agent_id = ?2",
                params![topic_id, agent_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Subscribers of a topic in subscription order.
pub async fn list_subscribers(db: &Database, topic_id: &str) -> Result<Vec<String>, CourierError> {
    let topic_id = topic_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT agent_id FROM subscriptions WHERE topic_id = ?1
                 ORDER BY created_at ASC, agent_id ASC",
            )?;
            let rows = stmt.query_map(params![topic_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Create a group. Fails with `Validation` if the id is taken.
pub async fn create_group(
    db: &Database,
    id: &str,
    name: &str,
    mode: GroupMode,
) -> Result<Group, CourierError> {
    let group = Group {
        id: id.to_string(),
        name: name.to_string(),
        mode,
        created_at: Utc::now(),
    };
    let row = group.clone();
    db.connection()
        .call(move |conn| -> Result<(), CourierError> {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO agent_groups (id, name, mode, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        row.id,
                        row.name,
                        row.mode.to_string(),
                        encode_ts(row.created_at)
                    ],
                )
                .map_err(sqlite_err)?;
            if inserted == 0 {
                return Err(CourierError::Validation(format!(
                    "group {} already exists",
                    row.id
                )));
            }
            Ok(())
        })
        .await
        .map_err(map_call_err)?;
    Ok(group)
}

pub async fn get_group(db: &Database, id: &str) -> Result<Option<Group>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Group>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, name, mode, created_at FROM agent_groups WHERE id = ?1",
                params![id],
                row_to_group,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Add an agent to a group. Idempotent.
pub async fn add_member(db: &Database, group_id: &str, agent_id: &str) -> Result<(), CourierError> {
    let group_id = group_id.to_string();
    let agent_id = agent_id.to_string();
    let now = encode_ts(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), CourierError> {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO group_members (group_id, agent_id, joined_at)
                     SELECT id, ?2, ?3 FROM agent_groups WHERE id = ?1",
                    params![group_id, agent_id, now],
                )
                .map_err(sqlite_err)?;
            if inserted == 0 && !exists(conn, "agent_groups", &group_id)? {
                return Err(CourierError::not_found("group", group_id));
            }
            Ok(())
        })
        .await
        .map_err(map_call_err)
}

/// Remove an agent from a group. Queue receipts the agent holds are not
/// released; they become claimable by others once their lease lapses.
pub async fn remove_member(
    db: &Database,
    group_id: &str,
    agent_id: &str,
) -> Result<bool, CourierError> {
    let group_id = group_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND agent_id = ?2",
                params![group_id, agent_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Members of a group in join order.
pub async fn list_members(db: &Database, group_id: &str) -> Result<Vec<String>, CourierError> {
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT agent_id FROM group_members WHERE group_id = ?1
                 ORDER BY joined_at ASC, agent_id ASC",
            )?;
            let rows = stmt.query_map(params![group_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

fn exists(conn: &rusqlite::Connection, table: &str, id: &str) -> Result<bool, CourierError> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
        params![id],
        |row| row.get(0),
    )
    .map_err(sqlite_err)
}
