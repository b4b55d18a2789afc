// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the collaborators the coordinator consumes.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod payment;
pub mod profile;
pub mod storage;

pub use adapter::PluginAdapter;
pub use payment::PaymentAdapter;
pub use profile::ProfileAdapter;
pub use storage::StorageAdapter;
