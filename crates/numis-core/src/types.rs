// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by every Numis crate.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of an authentication request. A chat session reuses the id of
/// the request it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh random request id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a human participant (submitter or expert).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a chat message, unique within its session.
///
/// Ids are origin-assigned (external delivery service, client idempotency
/// key) so a message delivered twice maps to the same id and is stored once.
/// Messages without an origin id get a random one and are never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Random id for a message with no natural identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Id for a message delivered by the external chat-delivery service.
    /// Origin ids are only unique per session on the delivery side.
    pub fn external(session_id: &RequestId, origin_id: &str) -> Self {
        Self(format!("ext:{session_id}:{origin_id}"))
    }

    /// Id derived from a direct client's idempotency key. Keys are chosen by
    /// each client independently, so the sender is part of the id.
    pub fn client(session_id: &RequestId, sender_id: &UserId, client_key: &str) -> Self {
        Self(format!("cli:{session_id}:{sender_id}:{client_key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle status of an authentication request.
///
/// ```text
/// Pending ──claim──▶ InReview ──end / expire──▶ Completed
///    │
///    └──reject──▶ Rejected
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InReview,
    Completed,
    Rejected,
}

impl RequestStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Rejected)
    }

    /// Whether `self -> to` is an edge of the lifecycle state machine.
    pub fn can_transition_to(self, to: RequestStatus) -> bool {
        matches!(
            (self, to),
            (RequestStatus::Pending, RequestStatus::InReview)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::InReview, RequestStatus::Completed)
        )
    }

    /// Whether a request in this status must carry an assigned expert.
    pub fn requires_assignee(self) -> bool {
        matches!(self, RequestStatus::InReview | RequestStatus::Completed)
    }
}

/// Why a request reached a terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// A participant ended the session.
    Explicit,
    /// The session timer fired.
    Expired,
    /// The request was withdrawn before any expert claimed it.
    Rejected,
}

/// Delivery path a chat message arrived through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    /// Sent through this service's own API or WebSocket.
    Direct,
    /// Ingested from the external chat-delivery service.
    External,
}

/// An authentication request and its lifecycle facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub id: RequestId,
    pub submitter_id: UserId,
    /// Set by the claim transition; `Some` exactly when status is InReview or Completed.
    pub assigned_expert_id: Option<UserId>,
    pub status: RequestStatus,
    /// Opaque media references, front first.
    pub images: Vec<String>,
    pub description: Option<String>,
    pub paid: bool,
    /// Amount debited in minor currency units. Immutable once recorded.
    pub paid_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub completion_reason: Option<CompletionReason>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl AuthRequest {
    /// Build a fresh Pending request.
    pub fn new_pending(new: NewAuthRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: RequestId::generate(),
            submitter_id: new.submitter_id,
            assigned_expert_id: None,
            status: RequestStatus::Pending,
            images: new.images,
            description: new.description,
            paid: new.paid_amount.is_some(),
            paid_amount: new.paid_amount,
            created_at: now,
            session_started_at: None,
            completion_reason: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Whether `user` is the submitter or the assigned expert.
    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.submitter_id == user || self.assigned_expert_id.as_ref() == Some(user)
    }

    /// Deadline of the chat session, if one has started.
    pub fn session_deadline(&self, duration: chrono::Duration) -> Option<DateTime<Utc>> {
        self.session_started_at.map(|started| started + duration)
    }
}

/// Input for creating a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuthRequest {
    pub submitter_id: UserId,
    pub images: Vec<String>,
    pub description: Option<String>,
    /// Amount already debited by the payment collaborator, if any.
    pub paid_amount: Option<i64>,
}

/// Field changes applied atomically together with a status transition.
///
/// This is the only way fields other than `status` change after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub assigned_expert_id: Option<UserId>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub completion_reason: Option<CompletionReason>,
}

impl RequestPatch {
    /// Patch for a successful claim.
    pub fn claim(expert_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            assigned_expert_id: Some(expert_id),
            session_started_at: Some(now),
            completion_reason: None,
        }
    }

    /// Patch for entering a terminal state.
    pub fn complete(reason: CompletionReason) -> Self {
        Self {
            completion_reason: Some(reason),
            ..Self::default()
        }
    }
}

/// One immutable chat utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: RequestId,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub source_channel: SourceChannel,
}

impl Message {
    /// Canonical transcript order: `sent_at`, then `id`.
    pub fn transcript_cmp(&self, other: &Self) -> Ordering {
        self.sent_at
            .cmp(&other.sent_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort messages into canonical transcript order.
pub fn sort_transcript(messages: &mut [Message]) {
    messages.sort_by(Message::transcript_cmp);
}

/// Drop sub-millisecond precision; stored timestamps carry milliseconds.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// Role of a session participant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Submitter,
    Expert,
}

/// Display metadata resolved by the identity/profile collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Identity snapshot of a participant taken when the session closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub role: ParticipantRole,
    /// `None` when the profile lookup failed or returned nothing.
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Immutable transcript snapshot of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub session_id: RequestId,
    pub generated_at: DateTime<Utc>,
    pub completion_reason: CompletionReason,
    pub participants: Vec<Participant>,
    pub transcript: Vec<Message>,
}

/// Result of a payment debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Approved,
    InsufficientFunds,
    Failed(String),
}

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

/// Identifies the kind of external collaborator an adapter stands in for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Payment,
    Profile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn msg(id: &str, millis: i64) -> Message {
        Message {
            id: MessageId::from(id),
            session_id: RequestId::from("req-1"),
            sender_id: UserId::from("alice"),
            body: format!("body {id}"),
            sent_at: DateTime::from_timestamp_millis(millis).unwrap(),
            source_channel: SourceChannel::Direct,
        }
    }

    #[test]
    fn state_machine_edges() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(InReview));
        assert!(Pending.can_transition_to(Rejected));
        assert!(InReview.can_transition_to(Completed));

        assert!(!InReview.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
        for to in [Pending, InReview, Completed, Rejected] {
            assert!(!Completed.can_transition_to(to));
            assert!(!Rejected.can_transition_to(to));
        }
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(RequestStatus::InReview.to_string(), "in_review");
        assert_eq!(
            RequestStatus::from_str("in_review").unwrap(),
            RequestStatus::InReview
        );
        let json = serde_json::to_string(&RequestStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
    }

    #[test]
    fn transcript_orders_by_sent_at_then_id() {
        let mut messages = vec![msg("1", 10), msg("2", 5), msg("0", 10)];
        sort_transcript(&mut messages);
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "0", "1"]);
    }

    #[test]
    fn origin_ids_are_scoped_to_session_and_sender() {
        let a = RequestId::from("req-a");
        let b = RequestId::from("req-b");
        assert_ne!(MessageId::external(&a, "1"), MessageId::external(&b, "1"));
        assert_eq!(MessageId::external(&a, "1").as_str(), "ext:req-a:1");

        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        assert_ne!(
            MessageId::client(&a, &alice, "1"),
            MessageId::client(&a, &bob, "1")
        );
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn new_pending_records_payment() {
        let now = Utc::now();
        let request = AuthRequest::new_pending(
            NewAuthRequest {
                submitter_id: UserId::from("alice"),
                images: vec!["front.jpg".into(), "back.jpg".into()],
                description: None,
                paid_amount: Some(500),
            },
            now,
        );
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.paid);
        assert_eq!(request.paid_amount, Some(500));
        assert!(request.assigned_expert_id.is_none());
        assert!(request.session_started_at.is_none());
    }

    proptest::proptest! {
        #[test]
        fn transcript_order_ignores_arrival_order(
            stamps in proptest::collection::vec(0i64..50, 1..20),
            seed in 0usize..1000,
        ) {
            let mut messages: Vec<Message> = stamps
                .iter()
                .enumerate()
                .map(|(i, t)| msg(&format!("m{i:02}"), *t))
                .collect();
            let mut expected = messages.clone();
            sort_transcript(&mut expected);

            let len = messages.len();
            messages.rotate_left(seed % len);
            messages.reverse();
            sort_transcript(&mut messages);
            proptest::prop_assert_eq!(messages, expected);
        }
    }
}
