// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `AuthService`: the externally exposed operations, wired from configuration.
//!
//! Every call takes the acting user explicitly; there is no ambient identity.

use std::sync::Arc;
use std::time::Duration;

use numis_bus::{EventBus, Subscription, Topic};
use numis_config::model::NumisConfig;
use numis_core::types::{
    AuthRequest, DebitOutcome, HealthStatus, Message, NewAuthRequest, RequestId,
    SessionDocument, UserId,
};
use numis_core::{NumisError, PaymentAdapter, ProfileAdapter, StorageAdapter};
use tracing::{info, warn};

use crate::archiver::SessionArchiver;
use crate::assignment::{AssignmentCoordinator, ClaimOutcome};
use crate::ledger::{ExternalMessage, MessageLedger};
use crate::lifecycle::{EndedSession, RecoveryReport, SessionLifecycle};
use crate::retry::RetryPolicy;
use crate::store::RequestStore;

pub struct AuthService {
    store: Arc<RequestStore>,
    assignment: AssignmentCoordinator,
    lifecycle: Arc<SessionLifecycle>,
    ledger: MessageLedger,
    payment: Arc<dyn PaymentAdapter>,
    request_price: Option<i64>,
}

impl AuthService {
    pub fn from_config(
        config: &NumisConfig,
        storage: Arc<dyn StorageAdapter>,
        payment: Arc<dyn PaymentAdapter>,
        profiles: Option<Arc<dyn ProfileAdapter>>,
    ) -> Result<Self, NumisError> {
        Self::with_session_duration(config, storage, payment, profiles, config.session.duration())
    }

    /// Like [`AuthService::from_config`] with an explicit session length,
    /// for durations finer than the config's whole seconds.
    pub fn with_session_duration(
        config: &NumisConfig,
        storage: Arc<dyn StorageAdapter>,
        payment: Arc<dyn PaymentAdapter>,
        profiles: Option<Arc<dyn ProfileAdapter>>,
        session_duration: Duration,
    ) -> Result<Self, NumisError> {
        let bus = Arc::new(EventBus::new(config.bus.subscriber_buffer));
        let store = Arc::new(RequestStore::new(
            Arc::clone(&storage),
            bus,
            RetryPolicy::from(&config.retry),
        ));
        let archiver = Arc::new(SessionArchiver::new(
            storage,
            profiles,
            config.archive.profile_lookup_timeout(),
            RetryPolicy::from(&config.archive),
        ));
        let lifecycle = Arc::new(SessionLifecycle::new(
            Arc::clone(&store),
            archiver,
            session_duration,
        )?);

        Ok(Self {
            assignment: AssignmentCoordinator::new(Arc::clone(&store), Arc::clone(&lifecycle)),
            ledger: MessageLedger::new(Arc::clone(&store), lifecycle.session_duration()),
            lifecycle,
            store,
            payment,
            request_price: config.session.request_price.filter(|price| *price > 0),
        })
    }

    /// Debit the submitter (when requests are priced), then enqueue a Pending
    /// request. Nothing is stored if the debit does not go through.
    pub async fn create_request(
        &self,
        submitter_id: UserId,
        images: Vec<String>,
        description: Option<String>,
    ) -> Result<AuthRequest, NumisError> {
        if let Some(price) = self.request_price {
            match self.payment.debit(&submitter_id, price).await? {
                DebitOutcome::Approved => {}
                DebitOutcome::InsufficientFunds => {
                    info!(user_id = %submitter_id, amount = price, "debit declined");
                    return Err(NumisError::PaymentDeclined {
                        user_id: submitter_id,
                    });
                }
                DebitOutcome::Failed(message) => {
                    warn!(user_id = %submitter_id, amount = price, error = %message, "debit failed");
                    return Err(NumisError::Payment(message));
                }
            }
        }

        self.store
            .create(NewAuthRequest {
                submitter_id,
                images,
                description,
                paid_amount: self.request_price,
            })
            .await
    }

    pub async fn list_pending_for_experts(&self) -> Result<Vec<AuthRequest>, NumisError> {
        self.store.list_pending().await
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<AuthRequest, NumisError> {
        self.store.get(id).await
    }

    pub async fn claim(
        &self,
        request_id: &RequestId,
        expert_id: &UserId,
    ) -> Result<ClaimOutcome, NumisError> {
        self.assignment.claim(request_id, expert_id).await
    }

    pub async fn reject_request(
        &self,
        request_id: &RequestId,
        submitter_id: &UserId,
    ) -> Result<AuthRequest, NumisError> {
        self.lifecycle.reject(request_id, submitter_id).await
    }

    pub async fn append_message(
        &self,
        session_id: &RequestId,
        sender_id: &UserId,
        body: &str,
        client_key: Option<&str>,
    ) -> Result<Message, NumisError> {
        self.ledger
            .append(session_id, sender_id, body, client_key)
            .await
    }

    pub async fn ingest_external(&self, message: ExternalMessage) -> Result<Message, NumisError> {
        self.ledger.ingest_external(message).await
    }

    pub async fn history(&self, session_id: &RequestId) -> Result<Vec<Message>, NumisError> {
        self.ledger.history(session_id).await
    }

    pub async fn end_session(
        &self,
        session_id: &RequestId,
        caller: &UserId,
    ) -> Result<EndedSession, NumisError> {
        self.lifecycle.end_session(session_id, caller).await
    }

    /// `Ok(None)` while a Completed session is still waiting on archival.
    pub async fn get_session_document(
        &self,
        session_id: &RequestId,
    ) -> Result<Option<SessionDocument>, NumisError> {
        self.store.get(session_id).await?;
        self.store.storage().get_document(session_id).await
    }

    pub fn subscribe(&self, topics: Vec<Topic>) -> Subscription {
        self.store.bus().subscribe_many(topics)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        self.store.bus()
    }

    /// Re-arm timers and re-enqueue archival after a restart.
    pub async fn recover(&self) -> Result<RecoveryReport, NumisError> {
        self.lifecycle.recover().await
    }

    pub async fn health(&self) -> HealthStatus {
        match self.store.storage().health_check().await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }

    /// Stop timers and close storage.
    pub async fn shutdown(&self) -> Result<(), NumisError> {
        self.lifecycle.shutdown();
        self.store.storage().close().await
    }
}
