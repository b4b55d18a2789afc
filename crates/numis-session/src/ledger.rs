// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message Ledger: the single write path for chat messages from every channel.
//!
//! Messages are deduplicated by id. Externally delivered ones carry the
//! delivery service's origin id and direct ones an optional client key, both
//! scoped to the session. Direct messages without a key are never collapsed.
//! History is ordered by `(sent_at, id)` at read time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use numis_bus::{BusEvent, EventKind, Topic};
use numis_core::types::{
    sort_transcript, truncate_to_millis, AuthRequest, Message, MessageId, RequestId,
    RequestStatus, SourceChannel, UserId,
};
use numis_core::NumisError;
use serde::Deserialize;
use tracing::{debug, info};

use crate::retry::with_backoff;
use crate::store::RequestStore;

/// A message delivered by the external chat-delivery service.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalMessage {
    pub session_id: RequestId,
    /// Id assigned by the delivery service; stable across redeliveries.
    pub origin_id: String,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

pub struct MessageLedger {
    store: Arc<RequestStore>,
    session_duration: chrono::Duration,
}

impl MessageLedger {
    pub fn new(store: Arc<RequestStore>, session_duration: chrono::Duration) -> Self {
        Self {
            store,
            session_duration,
        }
    }

    /// Append a message sent directly through this service. `sent_at` is
    /// stamped on arrival.
    pub async fn append(
        &self,
        session_id: &RequestId,
        sender_id: &UserId,
        body: &str,
        client_key: Option<&str>,
    ) -> Result<Message, NumisError> {
        let sent_at = truncate_to_millis(Utc::now());
        let id = match client_key {
            Some(key) => MessageId::client(session_id, sender_id, key),
            None => MessageId::generate(),
        };
        self.record(Message {
            id,
            session_id: session_id.clone(),
            sender_id: sender_id.clone(),
            body: body.to_string(),
            sent_at,
            source_channel: SourceChannel::Direct,
        })
        .await
    }

    /// Ingest a message from the external chat channel. Redeliveries return
    /// the stored message unchanged.
    pub async fn ingest_external(&self, external: ExternalMessage) -> Result<Message, NumisError> {
        self.record(Message {
            id: MessageId::external(&external.session_id, &external.origin_id),
            session_id: external.session_id,
            sender_id: external.sender_id,
            body: external.body,
            sent_at: truncate_to_millis(external.sent_at),
            source_channel: SourceChannel::External,
        })
        .await
    }

    async fn record(&self, message: Message) -> Result<Message, NumisError> {
        let request = self.store.get(&message.session_id).await?;
        if !request.is_participant(&message.sender_id) {
            return Err(NumisError::Forbidden {
                user_id: message.sender_id,
                request_id: message.session_id,
                action: "post to",
            });
        }

        if self.past_deadline(&request) {
            return self.replay_or_refuse(&request, &message.id).await;
        }

        let storage = self.store.storage();
        let stored = with_backoff(self.store.retry_policy(), "append_message", || {
            storage.append_message(&message)
        })
        .await?;

        if stored.inserted {
            debug!(
                session_id = %request.id,
                message_id = %stored.message.id,
                channel = %stored.message.source_channel,
                "message appended"
            );
            self.publish(&request, &stored.message);
        } else {
            info!(session_id = %request.id, message_id = %stored.message.id, "duplicate message ignored");
        }
        Ok(stored.message)
    }

    fn past_deadline(&self, request: &AuthRequest) -> bool {
        request.status == RequestStatus::InReview
            && request
                .session_deadline(self.session_duration)
                .is_some_and(|deadline| Utc::now() >= deadline)
    }

    /// The deadline has passed but the timer may not have fired yet. New
    /// messages are refused; a replay of a stored one still succeeds.
    async fn replay_or_refuse(
        &self,
        request: &AuthRequest,
        id: &MessageId,
    ) -> Result<Message, NumisError> {
        let existing = self
            .store
            .storage()
            .get_messages(&request.id)
            .await?
            .into_iter()
            .find(|m| &m.id == id);
        match existing {
            Some(message) => Ok(message),
            None => {
                debug!(session_id = %request.id, "append refused after session deadline");
                Err(NumisError::SessionNotActive {
                    session_id: request.id.clone(),
                    status: request.status,
                })
            }
        }
    }

    fn publish(&self, request: &AuthRequest, message: &Message) {
        let mut topics = vec![
            Topic::Request(request.id.clone()),
            Topic::Inbox(request.submitter_id.clone()),
        ];
        if let Some(expert) = &request.assigned_expert_id {
            topics.push(Topic::Inbox(expert.clone()));
        }
        self.store.bus().publish_all(
            &topics,
            BusEvent::new(
                request.id.clone(),
                EventKind::MessageAppended {
                    message: message.clone(),
                },
            ),
        );
    }

    /// Full transcript in canonical order, read from the ledger's own store.
    pub async fn history(&self, session_id: &RequestId) -> Result<Vec<Message>, NumisError> {
        self.store.get(session_id).await?;
        let storage = self.store.storage();
        let mut messages = with_backoff(self.store.retry_policy(), "get_messages", || {
            storage.get_messages(session_id)
        })
        .await?;
        sort_transcript(&mut messages);
        Ok(messages)
    }
}
