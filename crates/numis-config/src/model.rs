// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Numis configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NumisConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Event bus settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Session archival settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Retry policy for transient upstream failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Payment collaborator settings.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in logs and the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "numis".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("numis").join("numis.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("numis.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Chat session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Length of a chat session from the moment of claim, in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Price debited per request in minor currency units. `None` or `0` makes
    /// requests free.
    #[serde(default)]
    pub request_price: Option<i64>,
}

impl SessionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            request_price: None,
        }
    }
}

fn default_duration_secs() -> u64 {
    300
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Events buffered per subscriber before the oldest are dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_subscriber_buffer() -> usize {
    256
}

/// Session archival configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Background attempts before an archival failure is surfaced.
    #[serde(default = "default_archive_attempts")]
    pub max_attempts: u32,

    /// Initial backoff between attempts; doubles each time.
    #[serde(default = "default_archive_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound on a single profile lookup during archival.
    #[serde(default = "default_profile_lookup_timeout_ms")]
    pub profile_lookup_timeout_ms: u64,
}

impl ArchiveConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn profile_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_lookup_timeout_ms)
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_archive_attempts(),
            base_backoff_ms: default_archive_backoff_ms(),
            profile_lookup_timeout_ms: default_profile_lookup_timeout_ms(),
        }
    }
}

fn default_archive_attempts() -> u32 {
    5
}

fn default_archive_backoff_ms() -> u64 {
    200
}

fn default_profile_lookup_timeout_ms() -> u64 {
    500
}

/// Retry policy for `UpstreamUnavailable` errors on foreground operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first.
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    /// Initial backoff between attempts; doubles each time.
    #[serde(default = "default_retry_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl RetryConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            base_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    10
}

/// Payment collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Debit endpoint. `None` waives payment entirely.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout for the debit call.
    #[serde(default = "default_payment_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_payment_timeout_secs(),
        }
    }
}

fn default_payment_timeout_secs() -> u64 {
    10
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Enable the gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host to bind to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on every non-health route. `None` rejects all
    /// authenticated requests.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}
