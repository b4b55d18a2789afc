// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Numis integration tests.
//!
//! Provides mock collaborators and a harness that assembles the full
//! session coordinator over a throwaway SQLite database.
//!
//! # Components
//!
//! - [`MockPayment`] - scripted debit outcomes with a call log
//! - [`MockProfiles`] - in-memory profile directory with optional latency
//! - [`TestHarness`] - a wired [`numis_session::AuthService`]

pub mod harness;
pub mod mock_payment;
pub mod mock_profiles;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_payment::MockPayment;
pub use mock_profiles::MockProfiles;
