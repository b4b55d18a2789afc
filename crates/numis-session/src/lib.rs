// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request lifecycle and session coordination for Numis.
//!
//! [`AuthService`] is the entry point. Underneath it:
//! - [`RequestStore`] owns every request mutation via a single compare-and-swap
//!   and publishes the resulting events,
//! - [`AssignmentCoordinator`] arbitrates concurrent claims,
//! - [`SessionLifecycle`] and [`SessionTimer`] end sessions explicitly or on expiry,
//! - [`MessageLedger`] is the one write path for chat messages,
//! - [`SessionArchiver`] snapshots completed sessions.

pub mod archiver;
pub mod assignment;
pub mod ledger;
pub mod lifecycle;
pub mod payment;
pub mod retry;
pub mod service;
pub mod store;
pub mod timer;

#[cfg(test)]
mod testing;

pub use archiver::SessionArchiver;
pub use assignment::{AssignmentCoordinator, ClaimOutcome};
pub use ledger::{ExternalMessage, MessageLedger};
pub use lifecycle::{EndedSession, RecoveryReport, SessionLifecycle};
pub use payment::{payment_from_config, HttpPayment, WaivedPayment};
pub use retry::{with_backoff, RetryPolicy};
pub use service::AuthService;
pub use store::RequestStore;
pub use timer::SessionTimer;
