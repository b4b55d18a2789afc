// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle: arming timers on claim, ending sessions (explicitly or
//! on expiry), rejection, and startup recovery.
//!
//! Explicit end and timer expiry race through the same `InReview -> Completed`
//! compare-and-swap; exactly one of them wins and triggers archival.

use std::sync::Arc;
use std::time::Duration;

use numis_core::types::{
    AuthRequest, CompletionReason, RequestId, RequestPatch, RequestStatus, SessionDocument,
    UserId,
};
use numis_core::NumisError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archiver::SessionArchiver;
use crate::store::RequestStore;
use crate::timer::SessionTimer;

/// Result of a successful explicit end.
#[derive(Debug, Clone, Serialize)]
pub struct EndedSession {
    pub request: AuthRequest,
    /// `None` when inline archival failed and was handed to the background.
    pub document: Option<SessionDocument>,
}

/// What startup recovery found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub timers_rearmed: usize,
    pub archivals_queued: usize,
}

pub struct SessionLifecycle {
    store: Arc<RequestStore>,
    archiver: Arc<SessionArchiver>,
    timer: SessionTimer,
    session_duration: chrono::Duration,
}

impl SessionLifecycle {
    pub fn new(
        store: Arc<RequestStore>,
        archiver: Arc<SessionArchiver>,
        session_duration: Duration,
    ) -> Result<Self, NumisError> {
        let session_duration = chrono::Duration::from_std(session_duration)
            .map_err(|e| NumisError::Config(format!("session duration out of range: {e}")))?;
        Ok(Self {
            store,
            archiver,
            timer: SessionTimer::new(),
            session_duration,
        })
    }

    pub fn session_duration(&self) -> chrono::Duration {
        self.session_duration
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    /// Arm the expiry timer of an InReview session from its durable start time.
    pub fn arm(self: &Arc<Self>, request: &AuthRequest) {
        let Some(deadline) = request.session_deadline(self.session_duration) else {
            warn!(request_id = %request.id, "in-review request has no session start; not arming");
            return;
        };
        let lifecycle = Arc::clone(self);
        let id = request.id.clone();
        self.timer.arm(request.id.clone(), deadline, move || async move {
            if let Err(e) = lifecycle.expire(&id).await {
                warn!(request_id = %id, error = %e, "session expiry failed");
            }
        });
    }

    /// Timer callback: `InReview -> Completed(expired)`, then archive.
    ///
    /// Returns `false` when the session had already ended.
    pub async fn expire(&self, id: &RequestId) -> Result<bool, NumisError> {
        let patch = RequestPatch::complete(CompletionReason::Expired);
        match self
            .store
            .transition(id, RequestStatus::InReview, RequestStatus::Completed, patch)
            .await
        {
            Ok(_) => {
                info!(request_id = %id, "session expired");
                self.archiver.archive_with_retry(id).await?;
                Ok(true)
            }
            Err(NumisError::Conflict { actual, .. }) => {
                debug!(request_id = %id, status = %actual, "expiry lost to an earlier end");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Explicit end by either participant.
    ///
    /// Archival is attempted inline once; on failure it continues in the
    /// background and the session stays Completed.
    pub async fn end_session(
        self: &Arc<Self>,
        id: &RequestId,
        caller: &UserId,
    ) -> Result<EndedSession, NumisError> {
        let current = self.store.get(id).await?;
        if !current.is_participant(caller) {
            return Err(NumisError::Forbidden {
                user_id: caller.clone(),
                request_id: id.clone(),
                action: "end",
            });
        }
        if current.status != RequestStatus::InReview {
            return Err(NumisError::SessionNotActive {
                session_id: id.clone(),
                status: current.status,
            });
        }

        let patch = RequestPatch::complete(CompletionReason::Explicit);
        let request = match self
            .store
            .transition(id, RequestStatus::InReview, RequestStatus::Completed, patch)
            .await
        {
            Ok(request) => request,
            Err(NumisError::Conflict { actual, .. }) => {
                return Err(NumisError::SessionNotActive {
                    session_id: id.clone(),
                    status: actual,
                });
            }
            Err(e) => return Err(e),
        };
        self.timer.cancel(id);
        info!(request_id = %id, ended_by = %caller, "session ended");

        let document = match self.archiver.archive(id).await {
            Ok(document) => Some(document),
            Err(e) => {
                warn!(request_id = %id, error = %e, "inline archival failed; retrying in background");
                self.archiver.spawn_archive(id.clone());
                None
            }
        };
        Ok(EndedSession { request, document })
    }

    /// Submitter withdraws a Pending request.
    pub async fn reject(
        &self,
        id: &RequestId,
        submitter: &UserId,
    ) -> Result<AuthRequest, NumisError> {
        let current = self.store.get(id).await?;
        if &current.submitter_id != submitter {
            return Err(NumisError::Forbidden {
                user_id: submitter.clone(),
                request_id: id.clone(),
                action: "reject",
            });
        }
        let request = self
            .store
            .transition(
                id,
                RequestStatus::Pending,
                RequestStatus::Rejected,
                RequestPatch::complete(CompletionReason::Rejected),
            )
            .await?;
        self.timer.cancel(id);
        info!(request_id = %id, "request rejected");
        Ok(request)
    }

    /// Rebuild volatile state from durable storage after a restart.
    pub async fn recover(self: &Arc<Self>) -> Result<RecoveryReport, NumisError> {
        let mut report = RecoveryReport::default();
        for request in self.store.list(RequestStatus::InReview).await? {
            self.arm(&request);
            report.timers_rearmed += 1;
        }
        for request in self.store.list_unarchived().await? {
            self.archiver.spawn_archive(request.id);
            report.archivals_queued += 1;
        }
        info!(
            timers_rearmed = report.timers_rearmed,
            archivals_queued = report.archivals_queued,
            "session state recovered"
        );
        Ok(report)
    }

    pub fn shutdown(&self) {
        self.timer.shutdown();
    }
}
