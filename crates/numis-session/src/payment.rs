// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment collaborator clients.
//!
//! [`HttpPayment`] posts a JSON debit to a configured endpoint.
//! [`WaivedPayment`] approves everything and is used when no endpoint is set.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use numis_config::model::PaymentConfig;
use numis_core::types::{AdapterType, DebitOutcome, HealthStatus, UserId};
use numis_core::{NumisError, PaymentAdapter, PluginAdapter};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct DebitRequest<'a> {
    user_id: &'a UserId,
    amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DebitStatus {
    Approved,
    InsufficientFunds,
    Failed,
}

#[derive(Debug, Deserialize)]
struct DebitResponse {
    status: DebitStatus,
    #[serde(default)]
    message: Option<String>,
}

/// Debits through an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpPayment {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPayment {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, NumisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NumisError::Config(format!("failed to build payment client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PluginAdapter for HttpPayment {
    fn name(&self) -> &str {
        "http-payment"
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
impl PaymentAdapter for HttpPayment {
    async fn debit(&self, user_id: &UserId, amount: i64) -> Result<DebitOutcome, NumisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DebitRequest { user_id, amount })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NumisError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    NumisError::UpstreamUnavailable {
                        service: "payment",
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        debug!(user_id = %user_id, amount, status = %status, "debit response received");

        if status == StatusCode::PAYMENT_REQUIRED {
            return Ok(DebitOutcome::InsufficientFunds);
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "payment service error");
            return Err(NumisError::UpstreamUnavailable {
                service: "payment",
                message: format!("payment service returned {status}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(DebitOutcome::Failed(format!("payment service returned {status}: {body}")));
        }

        let parsed: DebitResponse = response.json().await.map_err(|e| {
            NumisError::Payment(format!("failed to parse debit response: {e}"))
        })?;
        Ok(match parsed.status {
            DebitStatus::Approved => DebitOutcome::Approved,
            DebitStatus::InsufficientFunds => DebitOutcome::InsufficientFunds,
            DebitStatus::Failed => {
                DebitOutcome::Failed(parsed.message.unwrap_or_else(|| "debit failed".into()))
            }
        })
    }
}

/// Approves every debit. Used when requests are free.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaivedPayment;

#[async_trait]
impl PluginAdapter for WaivedPayment {
    fn name(&self) -> &str {
        "waived-payment"
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
impl PaymentAdapter for WaivedPayment {
    async fn debit(&self, _user_id: &UserId, _amount: i64) -> Result<DebitOutcome, NumisError> {
        Ok(DebitOutcome::Approved)
    }
}

/// Pick the payment client for `config`.
pub fn payment_from_config(config: &PaymentConfig) -> Result<Arc<dyn PaymentAdapter>, NumisError> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpPayment::new(
            endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(WaivedPayment)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpPayment {
        HttpPayment::new(format!("{}/debit", server.uri()), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn approved_debit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/debit"))
            .and(body_json(serde_json::json!({"user_id": "alice", "amount": 500})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "approved"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server)
            .debit(&UserId::from("alice"), 500)
            .await
            .unwrap();
        assert_eq!(outcome, DebitOutcome::Approved);
    }

    #[tokio::test]
    async fn payment_required_is_insufficient_funds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .debit(&UserId::from("alice"), 500)
            .await
            .unwrap();
        assert_eq!(outcome, DebitOutcome::InsufficientFunds);
    }

    #[tokio::test]
    async fn failed_status_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"status": "failed", "message": "card expired"}),
            ))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .debit(&UserId::from("alice"), 500)
            .await
            .unwrap();
        assert_eq!(outcome, DebitOutcome::Failed("card expired".into()));
    }

    #[tokio::test]
    async fn server_error_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .debit(&UserId::from("alice"), 500)
            .await
            .unwrap_err();
        assert!(matches!(err, NumisError::UpstreamUnavailable { service: "payment", .. }));
    }

    #[tokio::test]
    async fn missing_endpoint_waives_payment() {
        let payment = payment_from_config(&PaymentConfig::default()).unwrap();
        assert_eq!(payment.name(), "waived-payment");
        assert_eq!(
            payment.debit(&UserId::from("alice"), 1_000).await.unwrap(),
            DebitOutcome::Approved
        );
    }
}
