// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment Coordinator: the claim path.

use std::sync::Arc;

use chrono::Utc;
use numis_core::types::{truncate_to_millis, AuthRequest, RequestId, RequestPatch, RequestStatus, UserId};
use numis_core::NumisError;
use serde::Serialize;
use tracing::{debug, info};

use crate::lifecycle::SessionLifecycle;
use crate::store::RequestStore;

/// Outcome of a claim attempt. Losing a race is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    Accepted { request: AuthRequest },
    AlreadyClaimed,
    NotPending { status: RequestStatus },
}

pub struct AssignmentCoordinator {
    store: Arc<RequestStore>,
    lifecycle: Arc<SessionLifecycle>,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<RequestStore>, lifecycle: Arc<SessionLifecycle>) -> Self {
        Self { store, lifecycle }
    }

    /// `Pending -> InReview` for `expert_id`. A successful swap is the proof of
    /// ownership; the session timer is armed before returning.
    pub async fn claim(
        &self,
        request_id: &RequestId,
        expert_id: &UserId,
    ) -> Result<ClaimOutcome, NumisError> {
        let patch = RequestPatch::claim(expert_id.clone(), truncate_to_millis(Utc::now()));
        match self
            .store
            .transition(request_id, RequestStatus::Pending, RequestStatus::InReview, patch)
            .await
        {
            Ok(request) => {
                self.lifecycle.arm(&request);
                info!(request_id = %request_id, expert_id = %expert_id, "request claimed");
                Ok(ClaimOutcome::Accepted { request })
            }
            Err(NumisError::Conflict { actual, .. }) => {
                debug!(request_id = %request_id, expert_id = %expert_id, status = %actual, "claim lost");
                Ok(match actual {
                    RequestStatus::InReview => ClaimOutcome::AlreadyClaimed,
                    status => ClaimOutcome::NotPending { status },
                })
            }
            Err(e) => Err(e),
        }
    }
}
