// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage and profile adapter traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use numis_config::model::StorageConfig;
use numis_core::traits::storage::StoredMessage;
use numis_core::types::{
    AuthRequest, Message, Profile, RequestId, RequestPatch, RequestStatus, SessionDocument,
    UserId,
};
use numis_core::{
    AdapterType, HealthStatus, NumisError, PluginAdapter, ProfileAdapter, StorageAdapter,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on [`StorageAdapter::initialize`]; every other call
/// fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, NumisError> {
        self.db.get().ok_or_else(|| NumisError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Insert or refresh a profile snapshot row.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), NumisError> {
        queries::profiles::upsert_profile(self.db()?, profile).await
    }

    async fn checkpoint(&self) -> Result<(), NumisError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, NumisError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(_) => return Ok(HealthStatus::Unhealthy("not initialized".to_string())),
        };
        match db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
        {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), NumisError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), NumisError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| NumisError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), NumisError> {
        self.checkpoint().await
    }

    async fn insert_request(&self, request: &AuthRequest) -> Result<(), NumisError> {
        queries::requests::insert_request(self.db()?, request).await
    }

    async fn get_request(&self, id: &RequestId) -> Result<Option<AuthRequest>, NumisError> {
        queries::requests::get_request(self.db()?, id).await
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AuthRequest>, NumisError> {
        queries::requests::list_requests(self.db()?, status).await
    }

    async fn transition_request(
        &self,
        id: &RequestId,
        from: RequestStatus,
        to: RequestStatus,
        patch: &RequestPatch,
        now: DateTime<Utc>,
    ) -> Result<AuthRequest, NumisError> {
        queries::requests::transition_request(self.db()?, id, from, to, patch, now).await
    }

    async fn list_unarchived(&self) -> Result<Vec<AuthRequest>, NumisError> {
        queries::requests::list_unarchived(self.db()?).await
    }

    async fn append_message(&self, message: &Message) -> Result<StoredMessage, NumisError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn get_messages(&self, session_id: &RequestId) -> Result<Vec<Message>, NumisError> {
        queries::messages::get_messages(self.db()?, session_id).await
    }

    async fn insert_document(
        &self,
        document: &SessionDocument,
    ) -> Result<SessionDocument, NumisError> {
        queries::documents::insert_document(self.db()?, document).await
    }

    async fn get_document(
        &self,
        session_id: &RequestId,
    ) -> Result<Option<SessionDocument>, NumisError> {
        queries::documents::get_document(self.db()?, session_id).await
    }
}

#[async_trait]
impl ProfileAdapter for SqliteStorage {
    async fn lookup(&self, user_id: &UserId) -> Result<Option<Profile>, NumisError> {
        queries::profiles::get_profile(self.db()?, user_id).await
    }
}
