// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session Archiver: snapshots a completed session into an immutable document.
//!
//! Archival is keyed by session id and idempotent. Content is a pure function
//! of stored state, so a repeat call after a crash produces the same document.
//! Profile lookups are best-effort and bounded by a timeout.

use std::sync::Arc;
use std::time::Duration;

use numis_core::types::{
    sort_transcript, AuthRequest, Participant, ParticipantRole, RequestId, RequestStatus,
    SessionDocument, UserId,
};
use numis_core::{NumisError, ProfileAdapter, StorageAdapter};
use tracing::{debug, error, info, warn};

use crate::retry::{millis, RetryPolicy};

pub struct SessionArchiver {
    storage: Arc<dyn StorageAdapter>,
    profiles: Option<Arc<dyn ProfileAdapter>>,
    lookup_timeout: Duration,
    retry: RetryPolicy,
}

impl SessionArchiver {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        profiles: Option<Arc<dyn ProfileAdapter>>,
        lookup_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            storage,
            profiles,
            lookup_timeout,
            retry,
        }
    }

    /// Produce (or return the existing) document of a completed session.
    pub async fn archive(&self, request_id: &RequestId) -> Result<SessionDocument, NumisError> {
        if let Some(existing) = self.storage.get_document(request_id).await? {
            debug!(request_id = %request_id, "session already archived");
            return Ok(existing);
        }

        let request = self
            .storage
            .get_request(request_id)
            .await?
            .ok_or_else(|| NumisError::not_found("request", request_id.as_str()))?;
        if request.status != RequestStatus::Completed {
            return Err(NumisError::ArchivalFailure {
                session_id: request_id.clone(),
                message: format!("session is {}, not completed", request.status),
            });
        }

        let document = self.build_document(&request).await?;
        let stored = self.storage.insert_document(&document).await?;
        info!(
            request_id = %request_id,
            messages = stored.transcript.len(),
            reason = %stored.completion_reason,
            "session archived"
        );
        Ok(stored)
    }

    async fn build_document(&self, request: &AuthRequest) -> Result<SessionDocument, NumisError> {
        let mut transcript = self.storage.get_messages(&request.id).await?;
        sort_transcript(&mut transcript);

        let mut participants = vec![
            self.snapshot(&request.submitter_id, ParticipantRole::Submitter)
                .await,
        ];
        if let Some(expert) = &request.assigned_expert_id {
            participants.push(self.snapshot(expert, ParticipantRole::Expert).await);
        }

        let completion_reason = request.completion_reason.ok_or_else(|| {
            NumisError::ArchivalFailure {
                session_id: request.id.clone(),
                message: "completed request has no completion reason".to_string(),
            }
        })?;

        Ok(SessionDocument {
            session_id: request.id.clone(),
            generated_at: request.completed_at.unwrap_or(request.updated_at),
            completion_reason,
            participants,
            transcript,
        })
    }

    async fn snapshot(&self, user_id: &UserId, role: ParticipantRole) -> Participant {
        let profile = match &self.profiles {
            None => None,
            Some(profiles) => {
                match tokio::time::timeout(self.lookup_timeout, profiles.lookup(user_id)).await {
                    Ok(Ok(profile)) => profile,
                    Ok(Err(e)) => {
                        warn!(user_id = %user_id, error = %e, "profile lookup failed");
                        None
                    }
                    Err(_) => {
                        warn!(user_id = %user_id, timeout_ms = millis(self.lookup_timeout), "profile lookup timed out");
                        None
                    }
                }
            }
        };
        Participant {
            user_id: user_id.clone(),
            role,
            display_name: profile.as_ref().map(|p| p.display_name.clone()),
            avatar_url: profile.and_then(|p| p.avatar_url),
        }
    }

    /// Archive with exponential backoff on any failure.
    ///
    /// The session stays Completed whatever happens here; a request left
    /// without a document is picked up again by startup recovery.
    pub async fn archive_with_retry(
        &self,
        request_id: &RequestId,
    ) -> Result<SessionDocument, NumisError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.archive(request_id).await {
                Ok(document) => return Ok(document),
                Err(e @ NumisError::NotFound { .. }) => return Err(e),
                Err(e) if attempt >= self.retry.max_attempts => {
                    error!(
                        request_id = %request_id,
                        attempts = attempt,
                        error = %e,
                        "archival failed; session left completed without a document"
                    );
                    return Err(NumisError::ArchivalFailure {
                        session_id: request_id.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    let backoff = self.retry.backoff_for(attempt);
                    warn!(
                        request_id = %request_id,
                        attempt,
                        backoff_ms = millis(backoff),
                        error = %e,
                        "archival failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Fire-and-forget archival with retries.
    pub fn spawn_archive(self: &Arc<Self>, request_id: RequestId) -> tokio::task::JoinHandle<()> {
        let archiver = Arc::clone(self);
        tokio::spawn(async move {
            let _ = archiver.archive_with_retry(&request_id).await;
        })
    }
}
