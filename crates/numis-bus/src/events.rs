// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event payloads carried on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use numis_core::types::{AuthRequest, CompletionReason, Message, RequestId, UserId};

/// A single change notification. `event_id` is unique per published event and
/// identical on every topic the event is fanned out to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub event_id: Uuid,
    pub request_id: RequestId,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    RequestCreated { request: AuthRequest },
    RequestClaimed { expert_id: UserId },
    RequestCompleted { reason: CompletionReason },
    MessageAppended { message: Message },
}

impl BusEvent {
    pub fn new(request_id: RequestId, kind: EventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            request_id,
            occurred_at: Utc::now(),
            kind,
        }
    }

    /// Short event name, e.g. `request_claimed`.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::RequestCreated { .. } => "request_created",
            EventKind::RequestClaimed { .. } => "request_claimed",
            EventKind::RequestCompleted { .. } => "request_completed",
            EventKind::MessageAppended { .. } => "message_appended",
        }
    }
}
