// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment collaborator: an opaque "debit succeeds or fails" call.

use async_trait::async_trait;

use crate::error::NumisError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{DebitOutcome, UserId};

/// Adapter for the payment collaborator.
///
/// Called once before a request is created. The coordinator never retries a
/// debit; transport failures surface as `UpstreamUnavailable`.
#[async_trait]
pub trait PaymentAdapter: PluginAdapter {
    /// Debit `amount` minor currency units from `user_id`.
    async fn debit(&self, user_id: &UserId, amount: i64) -> Result<DebitOutcome, NumisError>;
}
