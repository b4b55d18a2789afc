// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request Store: sole writer of request fields, publisher of their changes.

use std::sync::Arc;

use chrono::Utc;
use numis_bus::{BusEvent, EventBus, EventKind, Topic};
use numis_core::types::{
    truncate_to_millis, AuthRequest, CompletionReason, NewAuthRequest, RequestId, RequestPatch,
    RequestStatus,
};
use numis_core::{NumisError, StorageAdapter};
use tracing::{debug, info};

use crate::retry::{with_backoff, RetryPolicy};

pub struct RequestStore {
    storage: Arc<dyn StorageAdapter>,
    bus: Arc<EventBus>,
    retry: RetryPolicy,
}

impl RequestStore {
    pub fn new(storage: Arc<dyn StorageAdapter>, bus: Arc<EventBus>, retry: RetryPolicy) -> Self {
        Self {
            storage,
            bus,
            retry,
        }
    }

    /// Persist a new Pending request and announce it.
    pub async fn create(&self, new: NewAuthRequest) -> Result<AuthRequest, NumisError> {
        let request = AuthRequest::new_pending(new, truncate_to_millis(Utc::now()));
        with_backoff(&self.retry, "insert_request", || {
            self.storage.insert_request(&request)
        })
        .await?;

        info!(
            request_id = %request.id,
            submitter_id = %request.submitter_id,
            images = request.images.len(),
            paid = request.paid,
            "request created"
        );
        self.bus.publish_all(
            &[
                Topic::Request(request.id.clone()),
                Topic::Inbox(request.submitter_id.clone()),
                Topic::PendingQueue,
            ],
            BusEvent::new(
                request.id.clone(),
                EventKind::RequestCreated {
                    request: request.clone(),
                },
            ),
        );
        Ok(request)
    }

    pub async fn get(&self, id: &RequestId) -> Result<AuthRequest, NumisError> {
        with_backoff(&self.retry, "get_request", || self.storage.get_request(id))
            .await?
            .ok_or_else(|| NumisError::not_found("request", id.as_str()))
    }

    /// Pending requests in insertion order.
    pub async fn list_pending(&self) -> Result<Vec<AuthRequest>, NumisError> {
        self.list(RequestStatus::Pending).await
    }

    pub async fn list(&self, status: RequestStatus) -> Result<Vec<AuthRequest>, NumisError> {
        with_backoff(&self.retry, "list_requests", || {
            self.storage.list_requests(Some(status))
        })
        .await
    }

    /// Completed requests that still lack a session document.
    pub async fn list_unarchived(&self) -> Result<Vec<AuthRequest>, NumisError> {
        with_backoff(&self.retry, "list_unarchived", || self.storage.list_unarchived()).await
    }

    /// The only mutation primitive: compare-and-swap `from -> to` with `patch`.
    ///
    /// On success the matching change event is published after the commit.
    /// A lost race returns `Conflict` and publishes nothing.
    pub async fn transition(
        &self,
        id: &RequestId,
        from: RequestStatus,
        to: RequestStatus,
        patch: RequestPatch,
    ) -> Result<AuthRequest, NumisError> {
        let now = truncate_to_millis(Utc::now());
        let result = with_backoff(&self.retry, "transition_request", || {
            self.storage.transition_request(id, from, to, &patch, now)
        })
        .await;

        let request = match result {
            Ok(request) => request,
            Err(e @ NumisError::Conflict { .. }) => {
                debug!(request_id = %id, %from, %to, error = %e, "transition lost race");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(request_id = %id, %from, %to, "request transitioned");
        self.publish_transition(from, &request);
        Ok(request)
    }

    fn publish_transition(&self, from: RequestStatus, request: &AuthRequest) {
        let kind = match (request.status, &request.assigned_expert_id) {
            (RequestStatus::InReview, Some(expert)) => EventKind::RequestClaimed {
                expert_id: expert.clone(),
            },
            (RequestStatus::Completed | RequestStatus::Rejected, _) => {
                EventKind::RequestCompleted {
                    reason: request.completion_reason.unwrap_or(CompletionReason::Explicit),
                }
            }
            _ => return,
        };

        let mut topics = vec![
            Topic::Request(request.id.clone()),
            Topic::Inbox(request.submitter_id.clone()),
        ];
        if let Some(expert) = &request.assigned_expert_id {
            topics.push(Topic::Inbox(expert.clone()));
        }
        if from == RequestStatus::Pending {
            topics.push(Topic::PendingQueue);
        }
        self.bus
            .publish_all(&topics, BusEvent::new(request.id.clone(), kind));
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}
