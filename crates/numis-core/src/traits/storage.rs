// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the durable relational store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::NumisError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AuthRequest, Message, RequestId, RequestPatch, RequestStatus, SessionDocument,
};

/// Outcome of persisting a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// The canonical stored message. For a duplicate delivery this is the
    /// row written by the first delivery.
    pub message: Message,
    /// `false` when the id already existed and nothing was written.
    pub inserted: bool,
}

/// Adapter for the durable store backing requests, messages and documents.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), NumisError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), NumisError>;

    // --- Requests ---

    /// Insert a freshly created request.
    async fn insert_request(&self, request: &AuthRequest) -> Result<(), NumisError>;

    /// Fetch a request by id.
    async fn get_request(&self, id: &RequestId) -> Result<Option<AuthRequest>, NumisError>;

    /// List requests in insertion order, optionally filtered by status.
    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AuthRequest>, NumisError>;

    /// Atomic compare-and-swap on `(id, status)`.
    ///
    /// Applies `patch` and sets `status = to` only if the current status is
    /// `from`. Returns `Conflict` carrying the actual status otherwise, and
    /// `NotFound` for an unknown id.
    async fn transition_request(
        &self,
        id: &RequestId,
        from: RequestStatus,
        to: RequestStatus,
        patch: &RequestPatch,
        now: DateTime<Utc>,
    ) -> Result<AuthRequest, NumisError>;

    /// Completed requests that have no session document yet.
    async fn list_unarchived(&self) -> Result<Vec<AuthRequest>, NumisError>;

    // --- Messages ---

    /// Insert a message if its session is InReview, atomically with the
    /// status check. An id already stored for the same session returns the
    /// stored row; ids are only unique per session.
    async fn append_message(&self, message: &Message) -> Result<StoredMessage, NumisError>;

    /// All messages of a session in `(sent_at, id)` order.
    async fn get_messages(&self, session_id: &RequestId) -> Result<Vec<Message>, NumisError>;

    // --- Session documents ---

    /// Insert a document unless one exists; returns whichever is stored.
    async fn insert_document(
        &self,
        document: &SessionDocument,
    ) -> Result<SessionDocument, NumisError>;

    /// Fetch the document of a session.
    async fn get_document(
        &self,
        session_id: &RequestId,
    ) -> Result<Option<SessionDocument>, NumisError>;
}
