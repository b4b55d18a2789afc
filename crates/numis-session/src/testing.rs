// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for unit tests in this crate.

use std::sync::Arc;
use std::time::Duration;

use numis_bus::EventBus;
use numis_config::model::StorageConfig;
use numis_core::types::{NewAuthRequest, UserId};
use numis_core::StorageAdapter;
use numis_storage::SqliteStorage;

use crate::archiver::SessionArchiver;
use crate::lifecycle::SessionLifecycle;
use crate::retry::RetryPolicy;
use crate::store::RequestStore;

pub(crate) struct Fixture {
    pub storage: Arc<SqliteStorage>,
    pub bus: Arc<EventBus>,
    pub store: Arc<RequestStore>,
    pub archiver: Arc<SessionArchiver>,
    pub lifecycle: Arc<SessionLifecycle>,
    _temp_dir: tempfile::TempDir,
}

pub(crate) async fn storage(dir: &tempfile::TempDir) -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("session.db").to_str().unwrap().to_string(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    Arc::new(storage)
}

pub(crate) async fn fixture(session_duration: Duration) -> Fixture {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = storage(&temp_dir).await;
    let bus = Arc::new(EventBus::new(64));
    let store = Arc::new(RequestStore::new(
        storage.clone(),
        Arc::clone(&bus),
        RetryPolicy::new(3, Duration::from_millis(5)),
    ));
    let archiver = Arc::new(SessionArchiver::new(
        storage.clone(),
        Some(storage.clone()),
        Duration::from_millis(200),
        RetryPolicy::new(3, Duration::from_millis(5)),
    ));
    let lifecycle = Arc::new(
        SessionLifecycle::new(Arc::clone(&store), Arc::clone(&archiver), session_duration)
            .unwrap(),
    );
    Fixture {
        storage,
        bus,
        store,
        archiver,
        lifecycle,
        _temp_dir: temp_dir,
    }
}

pub(crate) fn new_request(submitter: &str) -> NewAuthRequest {
    NewAuthRequest {
        submitter_id: UserId::from(submitter),
        images: vec!["obverse.jpg".into(), "reverse.jpg".into()],
        description: Some("1893-S Morgan dollar".into()),
        paid_amount: None,
    }
}
