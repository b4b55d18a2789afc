// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete [`AuthService`] with mock payment and
//! profile collaborators over a temp SQLite database.

use std::sync::Arc;
use std::time::Duration;

use numis_config::model::{NumisConfig, StorageConfig};
use numis_core::types::{AuthRequest, DebitOutcome, RequestId, SessionDocument, UserId};
use numis_core::{NumisError, StorageAdapter};
use numis_session::{AuthService, ClaimOutcome};
use numis_storage::SqliteStorage;

use crate::mock_payment::MockPayment;
use crate::mock_profiles::MockProfiles;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    session_duration: Duration,
    request_price: Option<i64>,
    payment_outcomes: Vec<DebitOutcome>,
    profiles: Vec<(String, String)>,
    profile_latency: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            session_duration: Duration::from_secs(300),
            request_price: None,
            payment_outcomes: Vec::new(),
            profiles: Vec::new(),
            profile_latency: None,
        }
    }

    /// Session length; sub-second values are allowed here.
    pub fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Price debited per request.
    pub fn with_request_price(mut self, price: i64) -> Self {
        self.request_price = Some(price);
        self
    }

    /// Scripted debit outcomes, consumed in order.
    pub fn with_payment_outcomes(mut self, outcomes: Vec<DebitOutcome>) -> Self {
        self.payment_outcomes = outcomes;
        self
    }

    /// Register a display name in the mock profile directory.
    pub fn with_profile(mut self, user_id: &str, display_name: &str) -> Self {
        self.profiles
            .push((user_id.to_string(), display_name.to_string()));
        self
    }

    /// Delay every profile lookup.
    pub fn with_profile_latency(mut self, latency: Duration) -> Self {
        self.profile_latency = Some(latency);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, NumisError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| NumisError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = NumisConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        config.session.request_price = self.request_price;
        config.archive.base_backoff_ms = 10;
        config.archive.profile_lookup_timeout_ms = 100;
        config.retry.base_backoff_ms = 5;

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let payment = Arc::new(MockPayment::with_outcomes(self.payment_outcomes));
        let mut profiles = MockProfiles::new();
        if let Some(latency) = self.profile_latency {
            profiles = profiles.with_latency(latency);
        }
        for (user_id, display_name) in &self.profiles {
            profiles.insert(user_id, display_name).await;
        }
        let profiles = Arc::new(profiles);

        let service = AuthService::with_session_duration(
            &config,
            storage.clone(),
            payment.clone(),
            Some(profiles.clone()),
            self.session_duration,
        )?;

        Ok(TestHarness {
            service: Arc::new(service),
            storage,
            payment,
            profiles,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub service: Arc<AuthService>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub payment: Arc<MockPayment>,
    pub profiles: Arc<MockProfiles>,
    pub config: NumisConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Submit a request with a single image.
    pub async fn create_request(&self, submitter: &str) -> Result<AuthRequest, NumisError> {
        self.service
            .create_request(
                UserId::from(submitter),
                vec!["obverse.jpg".to_string()],
                None,
            )
            .await
    }

    /// Create a request and have `expert` claim it.
    pub async fn open_session(
        &self,
        submitter: &str,
        expert: &str,
    ) -> Result<AuthRequest, NumisError> {
        let request = self.create_request(submitter).await?;
        match self.service.claim(&request.id, &UserId::from(expert)).await? {
            ClaimOutcome::Accepted { request } => Ok(request),
            other => Err(NumisError::Internal(format!(
                "claim of fresh request did not succeed: {other:?}"
            ))),
        }
    }

    /// Poll until the session document exists or `timeout` elapses.
    pub async fn wait_for_document(
        &self,
        session_id: &RequestId,
        timeout: Duration,
    ) -> Option<SessionDocument> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(Some(document)) = self.storage.get_document(session_id).await {
                return Some(document);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numis_core::types::RequestStatus;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(harness
            .service
            .list_pending_for_experts()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn open_session_claims_request() {
        let harness = TestHarness::builder().build().await.unwrap();
        let session = harness.open_session("alice", "bob").await.unwrap();
        assert_eq!(session.status, RequestStatus::InReview);
        assert_eq!(session.assigned_expert_id, Some(UserId::from("bob")));
    }

    #[tokio::test]
    async fn priced_requests_are_debited() {
        let harness = TestHarness::builder()
            .with_request_price(750)
            .build()
            .await
            .unwrap();
        harness.create_request("alice").await.unwrap();
        assert_eq!(
            harness.payment.debits().await,
            vec![(UserId::from("alice"), 750)]
        );
    }
}
