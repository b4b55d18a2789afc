// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock payment collaborator for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use numis_core::types::{AdapterType, DebitOutcome, HealthStatus, UserId};
use numis_core::{NumisError, PaymentAdapter, PluginAdapter};

/// A payment adapter that replays scripted outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty every
/// debit is approved.
pub struct MockPayment {
    outcomes: Arc<Mutex<VecDeque<DebitOutcome>>>,
    debits: Arc<Mutex<Vec<(UserId, i64)>>>,
}

impl MockPayment {
    pub fn new() -> Self {
        Self::with_outcomes(Vec::new())
    }

    pub fn with_outcomes(outcomes: Vec<DebitOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::from(outcomes))),
            debits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the outcome of a future debit.
    pub async fn push_outcome(&self, outcome: DebitOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Every debit attempted so far, in call order.
    pub async fn debits(&self) -> Vec<(UserId, i64)> {
        self.debits.lock().await.clone()
    }
}

impl Default for MockPayment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPayment {
    fn name(&self) -> &str {
        "mock-payment"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Payment
    }

    async fn health_check(&self) -> Result<HealthStatus, NumisError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NumisError> {
        Ok(())
    }
}

#[async_trait]
impl PaymentAdapter for MockPayment {
    async fn debit(&self, user_id: &UserId, amount: i64) -> Result<DebitOutcome, NumisError> {
        self.debits.lock().await.push((user_id.clone(), amount));
        Ok(self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or(DebitOutcome::Approved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_outcomes_then_approves() {
        let payment = MockPayment::with_outcomes(vec![DebitOutcome::InsufficientFunds]);
        let alice = UserId::from("alice");
        assert_eq!(
            payment.debit(&alice, 100).await.unwrap(),
            DebitOutcome::InsufficientFunds
        );
        assert_eq!(payment.debit(&alice, 100).await.unwrap(), DebitOutcome::Approved);
        assert_eq!(payment.debits().await.len(), 2);
    }
}
