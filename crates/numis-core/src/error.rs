// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the Numis session coordinator.
//!
//! `Conflict` and `SessionNotActive` describe normal concurrent outcomes and
//! are branched on by callers. Only `UpstreamUnavailable` and `Timeout` are
//! retryable.

use thiserror::Error;

use crate::types::{RequestId, RequestStatus, UserId};

/// The primary error type used across all Numis crates.
#[derive(Debug, Error)]
pub enum NumisError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors that are not transient (query failure, corrupt row).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unknown id.
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },

    /// A compare-and-swap transition lost a race.
    #[error("request {request_id} is {actual}, expected {expected}")]
    Conflict {
        request_id: RequestId,
        expected: RequestStatus,
        actual: RequestStatus,
    },

    /// The requested edge does not exist in the lifecycle state machine.
    #[error("transition {from} -> {to} is not permitted")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// The chat session is not (or no longer) accepting traffic.
    #[error("session {session_id} is not active (status {status})")]
    SessionNotActive {
        session_id: RequestId,
        status: RequestStatus,
    },

    /// The caller is not the participant allowed to perform the action.
    #[error("{user_id} may not {action} request {request_id}")]
    Forbidden {
        user_id: UserId,
        request_id: RequestId,
        action: &'static str,
    },

    /// A collaborator (database, payment, chat delivery) is unreachable.
    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    /// Writing a session document failed; the session stays Completed.
    #[error("archival of session {session_id} failed: {message}")]
    ArchivalFailure {
        session_id: RequestId,
        message: String,
    },

    /// The payment collaborator reported insufficient funds.
    #[error("payment declined for {user_id}: insufficient funds")]
    PaymentDeclined { user_id: UserId },

    /// The payment collaborator failed to process the debit.
    #[error("payment failed: {0}")]
    Payment(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NumisError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        NumisError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Transient infrastructure failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NumisError::UpstreamUnavailable { .. } | NumisError::Timeout { .. }
        )
    }

    /// Lost races and closed sessions: expected outcomes, never retried.
    pub fn is_expected_outcome(&self) -> bool {
        matches!(
            self,
            NumisError::Conflict { .. } | NumisError::SessionNotActive { .. }
        )
    }
}
