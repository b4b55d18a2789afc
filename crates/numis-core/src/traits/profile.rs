// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity/profile lookup used for session document snapshots.

use async_trait::async_trait;

use crate::error::NumisError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Profile, UserId};

/// Read-only, best-effort profile lookup.
#[async_trait]
pub trait ProfileAdapter: PluginAdapter {
    /// Resolve display metadata for a user. `Ok(None)` when unknown.
    async fn lookup(&self, user_id: &UserId) -> Result<Option<Profile>, NumisError>;
}
