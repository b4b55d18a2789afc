// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Numis authentication session coordinator.
//!
//! Defines the domain model (requests, messages, session documents), the
//! lifecycle state machine, the error taxonomy, and the adapter traits for
//! the durable store, the payment collaborator and the profile directory.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::NumisError;
pub use types::{
    AdapterType, AuthRequest, CompletionReason, HealthStatus, Message, MessageId, RequestId,
    RequestStatus, SessionDocument, SourceChannel, UserId,
};

pub use traits::{PaymentAdapter, PluginAdapter, ProfileAdapter, StorageAdapter};
