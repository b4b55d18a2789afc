// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Numis session coordinator.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for requests,
//! messages, session documents and profile snapshots.
//!
//! All writes are serialized through `tokio-rusqlite`'s background thread.
//! Query modules accept `&Database` and go through `Database::connection()`.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;
mod timestamps;

pub use adapter::SqliteStorage;
pub use database::Database;
