// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session document persistence. One row per session, written once.

use numis_core::types::{RequestId, SessionDocument};
use numis_core::NumisError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::timestamps::format_ts;

fn decode(json: &str) -> Result<SessionDocument, NumisError> {
    serde_json::from_str(json).map_err(|e| NumisError::Storage {
        source: Box::new(e),
    })
}

/// Insert `document` unless the session already has one, then return the
/// stored document. A second writer gets the first writer's content back.
pub async fn insert_document(
    db: &Database,
    document: &SessionDocument,
) -> Result<SessionDocument, NumisError> {
    let json = serde_json::to_string(document).map_err(|e| NumisError::Storage {
        source: Box::new(e),
    })?;
    let session_id = document.session_id.as_str().to_string();
    let generated_at = format_ts(&document.generated_at);
    let reason = document.completion_reason.to_string();

    let stored: String = db
        .connection()
        .call(move |conn| -> Result<String, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO session_documents
                     (session_id, generated_at, completion_reason, document)
                 VALUES (?1, ?2, ?3, ?4)",
                params![session_id, generated_at, reason, json],
            )?;
            let stored = tx.query_row(
                "SELECT document FROM session_documents WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(map_tr_err)?;

    decode(&stored)
}

/// Fetch the document of a session, if archived.
pub async fn get_document(
    db: &Database,
    session_id: &RequestId,
) -> Result<Option<SessionDocument>, NumisError> {
    let session_id = session_id.as_str().to_string();
    let stored: Option<String> = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT document FROM session_documents WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    stored.as_deref().map(decode).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::requests::insert_request;
    use chrono::Utc;
    use numis_core::types::{AuthRequest, CompletionReason, NewAuthRequest, UserId};
    use tempfile::tempdir;

    fn document(session_id: &RequestId, reason: CompletionReason) -> SessionDocument {
        SessionDocument {
            session_id: session_id.clone(),
            generated_at: numis_core::types::truncate_to_millis(Utc::now()),
            completion_reason: reason,
            participants: vec![],
            transcript: vec![],
        }
    }

    #[tokio::test]
    async fn first_document_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        let request = AuthRequest::new_pending(
            NewAuthRequest {
                submitter_id: UserId::from("alice"),
                images: vec![],
                description: None,
                paid_amount: None,
            },
            Utc::now(),
        );
        insert_request(&db, &request).await.unwrap();

        assert!(get_document(&db, &request.id).await.unwrap().is_none());

        let first = document(&request.id, CompletionReason::Explicit);
        let stored = insert_document(&db, &first).await.unwrap();
        assert_eq!(stored, first);

        let second = document(&request.id, CompletionReason::Expired);
        let stored_again = insert_document(&db, &second).await.unwrap();
        assert_eq!(stored_again, first);
        assert_eq!(get_document(&db, &request.id).await.unwrap(), Some(first));
    }
}
