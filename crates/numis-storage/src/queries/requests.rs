// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication request queries, including the compare-and-swap transition.

use chrono::{DateTime, Utc};
use numis_core::types::{AuthRequest, RequestId, RequestPatch, RequestStatus, UserId};
use numis_core::NumisError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::timestamps::{enum_column, format_ts, opt_enum_column, opt_ts_column, ts_column};

pub(crate) const REQUEST_COLUMNS: &str = "id, submitter_id, assigned_expert_id, status, images, \
     description, paid, paid_amount, created_at, session_started_at, completion_reason, \
     completed_at, updated_at";

pub(crate) fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuthRequest> {
    let images_json: String = row.get(4)?;
    let images: Vec<String> = serde_json::from_str(&images_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AuthRequest {
        id: RequestId(row.get(0)?),
        submitter_id: UserId(row.get(1)?),
        assigned_expert_id: row.get::<_, Option<String>>(2)?.map(UserId),
        status: enum_column(row, 3)?,
        images,
        description: row.get(5)?,
        paid: row.get(6)?,
        paid_amount: row.get(7)?,
        created_at: ts_column(row, 8)?,
        session_started_at: opt_ts_column(row, 9)?,
        completion_reason: opt_enum_column(row, 10)?,
        completed_at: opt_ts_column(row, 11)?,
        updated_at: ts_column(row, 12)?,
    })
}

/// Insert a new request.
pub async fn insert_request(db: &Database, request: &AuthRequest) -> Result<(), NumisError> {
    let images = serde_json::to_string(&request.images).map_err(|e| NumisError::Storage {
        source: Box::new(e),
    })?;
    let request = request.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO auth_requests (id, submitter_id, assigned_expert_id, status, images,
                     description, paid, paid_amount, created_at, session_started_at,
                     completion_reason, completed_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    request.id.as_str(),
                    request.submitter_id.as_str(),
                    request.assigned_expert_id.as_ref().map(|u| u.as_str()),
                    request.status.to_string(),
                    images,
                    request.description,
                    request.paid,
                    request.paid_amount,
                    format_ts(&request.created_at),
                    request.session_started_at.as_ref().map(format_ts),
                    request.completion_reason.map(|r| r.to_string()),
                    request.completed_at.as_ref().map(format_ts),
                    format_ts(&request.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a request by ID.
pub async fn get_request(db: &Database, id: &RequestId) -> Result<Option<AuthRequest>, NumisError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<AuthRequest>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM auth_requests WHERE id = ?1"),
                params![id],
                row_to_request,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List requests in insertion order, optionally filtered by status.
pub async fn list_requests(
    db: &Database,
    status: Option<RequestStatus>,
) -> Result<Vec<AuthRequest>, NumisError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<AuthRequest>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM auth_requests
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY seq ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_request)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Completed requests with no session document, oldest first.
pub async fn list_unarchived(db: &Database) -> Result<Vec<AuthRequest>, NumisError> {
    db.connection()
        .call(|conn| -> Result<Vec<AuthRequest>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM auth_requests r
                 WHERE r.status = 'completed'
                   AND NOT EXISTS (SELECT 1 FROM session_documents d WHERE d.session_id = r.id)
                 ORDER BY r.seq ASC"
            ))?;
            let rows = stmt.query_map([], row_to_request)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

enum CasOutcome {
    Applied(AuthRequest),
    Missing,
    Mismatch(RequestStatus),
}

/// Atomic compare-and-swap on `(id, status)`.
///
/// The UPDATE only matches when the stored status equals `from`. When no row
/// changes, the current row is read in the same transaction to tell an unknown
/// id from a lost race. `completed_at` is stamped when entering a terminal
/// state.
pub async fn transition_request(
    db: &Database,
    id: &RequestId,
    from: RequestStatus,
    to: RequestStatus,
    patch: &RequestPatch,
    now: DateTime<Utc>,
) -> Result<AuthRequest, NumisError> {
    if !from.can_transition_to(to) {
        return Err(NumisError::InvalidTransition { from, to });
    }

    let request_id = id.clone();
    let id = id.as_str().to_string();
    let patch = patch.clone();
    let now = format_ts(&now);
    let completed_at = to.is_terminal().then(|| now.clone());

    let outcome = db
        .connection()
        .call(move |conn| -> Result<CasOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE auth_requests SET
                     status = ?1,
                     assigned_expert_id = COALESCE(?2, assigned_expert_id),
                     session_started_at = COALESCE(?3, session_started_at),
                     completion_reason = COALESCE(?4, completion_reason),
                     completed_at = COALESCE(?5, completed_at),
                     updated_at = ?6
                 WHERE id = ?7 AND status = ?8",
                params![
                    to.to_string(),
                    patch.assigned_expert_id.as_ref().map(|u| u.as_str()),
                    patch.session_started_at.as_ref().map(format_ts),
                    patch.completion_reason.map(|r| r.to_string()),
                    completed_at,
                    now,
                    id,
                    from.to_string(),
                ],
            )?;
            let current = tx
                .query_row(
                    &format!("SELECT {REQUEST_COLUMNS} FROM auth_requests WHERE id = ?1"),
                    params![id],
                    row_to_request,
                )
                .optional()?;
            tx.commit()?;

            Ok(match current {
                None => CasOutcome::Missing,
                Some(request) if changed == 1 => CasOutcome::Applied(request),
                Some(request) => CasOutcome::Mismatch(request.status),
            })
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        CasOutcome::Applied(request) => Ok(request),
        CasOutcome::Missing => Err(NumisError::not_found("request", request_id.as_str())),
        CasOutcome::Mismatch(actual) => Err(NumisError::Conflict {
            request_id,
            expected: from,
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numis_core::types::{CompletionReason, NewAuthRequest};
    use tempfile::tempdir;

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("requests.db");
        Database::open(path.to_str().unwrap(), true).await.unwrap()
    }

    fn new_request(submitter: &str, paid: Option<i64>) -> AuthRequest {
        AuthRequest::new_pending(
            NewAuthRequest {
                submitter_id: UserId::from(submitter),
                images: vec!["obverse.jpg".into(), "reverse.jpg".into()],
                description: Some("1909-S VDB".into()),
                paid_amount: paid,
            },
            numis_core::types::truncate_to_millis(Utc::now()),
        )
    }

    #[tokio::test]
    async fn insert_and_get_preserves_fields() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let request = new_request("alice", Some(250));
        insert_request(&db, &request).await.unwrap();

        let loaded = get_request(&db, &request.id).await.unwrap().unwrap();
        assert_eq!(loaded, request);
        assert!(get_request(&db, &RequestId::from("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_keeps_insertion_order_and_filters() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let first = new_request("a", None);
        let second = new_request("b", None);
        let third = new_request("c", None);
        for r in [&first, &second, &third] {
            insert_request(&db, r).await.unwrap();
        }
        transition_request(
            &db,
            &second.id,
            RequestStatus::Pending,
            RequestStatus::InReview,
            &RequestPatch::claim(UserId::from("expert"), Utc::now()),
            Utc::now(),
        )
        .await
        .unwrap();

        let pending = list_requests(&db, Some(RequestStatus::Pending)).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![first.id.clone(), third.id.clone()]);

        let all = list_requests(&db, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].id, second.id);
    }

    #[tokio::test]
    async fn cas_applies_patch_once_then_conflicts() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let request = new_request("alice", None);
        insert_request(&db, &request).await.unwrap();

        let now = numis_core::types::truncate_to_millis(Utc::now());
        let claimed = transition_request(
            &db,
            &request.id,
            RequestStatus::Pending,
            RequestStatus::InReview,
            &RequestPatch::claim(UserId::from("bob"), now),
            now,
        )
        .await
        .unwrap();
        assert_eq!(claimed.status, RequestStatus::InReview);
        assert_eq!(claimed.assigned_expert_id, Some(UserId::from("bob")));
        assert_eq!(claimed.session_started_at, Some(now));
        assert!(claimed.completed_at.is_none());

        let err = transition_request(
            &db,
            &request.id,
            RequestStatus::Pending,
            RequestStatus::InReview,
            &RequestPatch::claim(UserId::from("carol"), now),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            NumisError::Conflict { actual: RequestStatus::InReview, .. }
        ));

        let stored = get_request(&db, &request.id).await.unwrap().unwrap();
        assert_eq!(stored.assigned_expert_id, Some(UserId::from("bob")));
    }

    #[tokio::test]
    async fn terminal_transition_stamps_completion() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let request = new_request("alice", None);
        insert_request(&db, &request).await.unwrap();
        let now = Utc::now();
        transition_request(
            &db,
            &request.id,
            RequestStatus::Pending,
            RequestStatus::InReview,
            &RequestPatch::claim(UserId::from("bob"), now),
            now,
        )
        .await
        .unwrap();

        let done = transition_request(
            &db,
            &request.id,
            RequestStatus::InReview,
            RequestStatus::Completed,
            &RequestPatch::complete(CompletionReason::Expired),
            now,
        )
        .await
        .unwrap();
        assert_eq!(done.completion_reason, Some(CompletionReason::Expired));
        assert!(done.completed_at.is_some());
        assert_eq!(done.assigned_expert_id, Some(UserId::from("bob")));

        let unarchived = list_unarchived(&db).await.unwrap();
        assert_eq!(unarchived.len(), 1);
        assert_eq!(unarchived[0].id, request.id);
    }

    #[tokio::test]
    async fn unknown_id_and_invalid_edge() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let err = transition_request(
            &db,
            &RequestId::from("nope"),
            RequestStatus::Pending,
            RequestStatus::Rejected,
            &RequestPatch::complete(CompletionReason::Rejected),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NumisError::NotFound { .. }));

        let err = transition_request(
            &db,
            &RequestId::from("nope"),
            RequestStatus::Completed,
            RequestStatus::Pending,
            &RequestPatch::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NumisError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn claim_without_assignee_is_refused_by_schema() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let request = new_request("alice", None);
        insert_request(&db, &request).await.unwrap();
        let err = transition_request(
            &db,
            &request.id,
            RequestStatus::Pending,
            RequestStatus::InReview,
            &RequestPatch::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NumisError::Storage { .. }));
        let stored = get_request(&db, &request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }
}
