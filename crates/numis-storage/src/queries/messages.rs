// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence for the session ledger.

use chrono::Utc;
use numis_core::traits::storage::StoredMessage;
use numis_core::types::{Message, MessageId, RequestId, RequestStatus, UserId};
use numis_core::NumisError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::timestamps::{enum_column, format_ts, millis_column};

const MESSAGE_COLUMNS: &str = "id, session_id, sender_id, body, sent_at_ms, source_channel";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId(row.get(0)?),
        session_id: RequestId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        body: row.get(3)?,
        sent_at: millis_column(row, 4)?,
        source_channel: enum_column(row, 5)?,
    })
}

enum AppendOutcome {
    Stored(StoredMessage),
    SessionMissing,
    NotActive(RequestStatus),
}

/// Insert a message while its session is InReview.
///
/// The status check, the duplicate check and the insert run in one
/// transaction on the writer thread, so no message lands after the session
/// leaves InReview. A message whose id is already stored for the same session
/// is returned as-is with `inserted = false`, whatever the session status.
pub async fn append_message(db: &Database, message: &Message) -> Result<StoredMessage, NumisError> {
    let message = message.clone();
    let session_id = message.session_id.clone();
    let received_at = format_ts(&Utc::now());

    let outcome = db
        .connection()
        .call(move |conn| -> Result<AppendOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;

            let existing = tx
                .query_row(
                    &format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_id = ?1 AND id = ?2"
                    ),
                    params![message.session_id.as_str(), message.id.as_str()],
                    row_to_message,
                )
                .optional()?;
            if let Some(existing) = existing {
                tx.commit()?;
                return Ok(AppendOutcome::Stored(StoredMessage {
                    message: existing,
                    inserted: false,
                }));
            }

            let status: Option<RequestStatus> = tx
                .query_row(
                    "SELECT status FROM auth_requests WHERE id = ?1",
                    params![message.session_id.as_str()],
                    |row| enum_column(row, 0),
                )
                .optional()?;
            let outcome = match status {
                None => AppendOutcome::SessionMissing,
                Some(RequestStatus::InReview) => {
                    tx.execute(
                        "INSERT INTO messages (id, session_id, sender_id, body, sent_at_ms,
                             source_channel, received_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            message.id.as_str(),
                            message.session_id.as_str(),
                            message.sender_id.as_str(),
                            message.body,
                            message.sent_at.timestamp_millis(),
                            message.source_channel.to_string(),
                            received_at,
                        ],
                    )?;
                    AppendOutcome::Stored(StoredMessage {
                        message,
                        inserted: true,
                    })
                }
                Some(other) => AppendOutcome::NotActive(other),
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        AppendOutcome::Stored(stored) => Ok(stored),
        AppendOutcome::SessionMissing => Err(NumisError::not_found("session", session_id.as_str())),
        AppendOutcome::NotActive(status) => Err(NumisError::SessionNotActive { session_id, status }),
    }
}

/// All messages of a session ordered by `(sent_at, id)`.
pub async fn get_messages(db: &Database, session_id: &RequestId) -> Result<Vec<Message>, NumisError> {
    let session_id = session_id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE session_id = ?1
                 ORDER BY sent_at_ms ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![session_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
