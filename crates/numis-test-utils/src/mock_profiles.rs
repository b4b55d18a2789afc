// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock profile directory.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use numis_core::types::{AdapterType, HealthStatus, Profile, UserId};
use numis_core::{NumisError, PluginAdapter, ProfileAdapter};

/// In-memory profiles. `latency` delays every lookup, for exercising the
/// archiver's lookup timeout.
pub struct MockProfiles {
    profiles: RwLock<HashMap<UserId, Profile>>,
    latency: Option<Duration>,
}

impl MockProfiles {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn insert(&self, user_id: &str, display_name: &str) {
        self.profiles.write().await.insert(
            UserId::from(user_id),
            Profile {
                user_id: UserId::from(user_id),
                display_name: display_name.to_string(),
                avatar_url: None,
            },
        );
    }
}

impl Default for MockProfiles {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProfiles {
    fn name(&self) -> &str {
        "mock-profiles"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Profile
    }

    async fn health_check(&self) -> Result<HealthStatus, NumisError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NumisError> {
        Ok(())
    }
}

#[async_trait]
impl ProfileAdapter for MockProfiles {
    async fn lookup(&self, user_id: &UserId) -> Result<Option<Profile>, NumisError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}
