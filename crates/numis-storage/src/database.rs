// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use numis_core::NumisError;
use rusqlite::ErrorCode;
use tracing::debug;

/// Handle to the single-writer SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs and run
    /// migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, NumisError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| NumisError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| NumisError::Storage {
                source: format!("failed to open {path}: {e}").into(),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            if wal_mode {
                let mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), NumisError> { crate::migrations::run_migrations(conn) })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => NumisError::Storage {
                    source: other.to_string().into(),
                },
            })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The single writer connection. Query modules call through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Map a tokio-rusqlite error onto the Numis taxonomy.
///
/// A closed connection and SQLITE_BUSY/LOCKED are transient and surface as
/// `UpstreamUnavailable` so callers can retry them.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> NumisError {
    match e {
        tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, message))
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) =>
        {
            NumisError::UpstreamUnavailable {
                service: "storage",
                message: message.unwrap_or_else(|| failure.to_string()),
            }
        }
        tokio_rusqlite::Error::Error(inner) => NumisError::Storage {
            source: Box::new(inner),
        },
        tokio_rusqlite::Error::ConnectionClosed => NumisError::UpstreamUnavailable {
            service: "storage",
            message: "connection closed".to_string(),
        },
        other => NumisError::Storage {
            source: other.to_string().into(),
        },
    }
}
